// ==========================================
// 闲置商品监控 - 融合评分配置管理命令
// ==========================================
// 用法:
//   bayes-profile list
//   bayes-profile show <version>
//   bayes-profile validate <version>
//   bayes-profile init <version>
//   bayes-profile copy <source> <target>
//   bayes-profile delete <version>
//   bayes-profile migrate <version>
//   bayes-profile set <version> <group.key> <value>
//   bayes-profile preview <version> <feature> [value]
//
// 存储后端由 BAYES_PROFILE_* 环境变量决定（见 EngineConfig）
// BAYES_PROFILE_LOG_FORMAT=json 时输出 JSON 日志
// ==========================================

use anyhow::{anyhow, bail, Context};
use bayes_profile_engine::config::{env_keys, EngineConfig};
use bayes_profile_engine::engine::checked_version_name;
use bayes_profile_engine::engine::migrator::LegacyMigrator;
use bayes_profile_engine::{logging, ProfileError, ProfileSession, ProfileStore, VersionManager};
use std::sync::Arc;

const USAGE: &str = "用法: bayes-profile <list|show|validate|init|copy|delete|migrate|set|preview> [参数...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_with_format(std::env::var(env_keys::LOG_FORMAT).ok().as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        bail!(USAGE);
    };
    let arg = |idx: usize, name: &str| required_arg(&args, idx, name);

    let config = EngineConfig::from_env()?;
    let store = config.open_store().context("打开配置存储失败")?;

    tracing::info!("{} v{}", bayes_profile_engine::APP_NAME, bayes_profile_engine::VERSION);

    match command {
        "list" => {
            // 只列名称，不加载文档（单个损坏版本不影响列表）
            let versions = VersionManager::new(store).try_list_versions().await?;
            for version in &versions {
                let marker = if *version == config.default_version { "*" } else { " " };
                println!("{} {}", marker, version);
            }
        }
        "show" => {
            let session = open_version(store, arg(1, "version")?).await?;
            let profile = session.current().ok_or(ProfileError::NoProfileLoaded)?;
            println!("{}", serde_json::to_string_pretty(profile)?);
        }
        "validate" => {
            let session = open_version(store, arg(1, "version")?).await?;
            let violations = session.validate()?;
            for warning in session.warnings()? {
                println!("提示: {}", warning);
            }
            if violations.is_empty() {
                println!("校验通过");
            } else {
                for violation in &violations {
                    println!("错误: {}", violation);
                }
                bail!("{} 项权重校验失败", violations.len());
            }
        }
        "init" => {
            let mut session = ProfileSession::open(store, None).await?;
            session.create_from_defaults(arg(1, "version")?, || true).await?;
            println!("已创建: {}", session.current_version().unwrap_or_default());
        }
        "copy" => {
            let mut session = open_version(store, arg(1, "source")?).await?;
            let created = session.copy_current(arg(2, "target")?).await?;
            println!("已复制为: {}", created);
        }
        "delete" => {
            // 按名称删除，无法加载的版本同样可以删除
            let version = checked_version_name(arg(1, "version")?)?;
            let fallback = VersionManager::new(store).delete_version(&version).await?;
            println!("已删除 {}，回退版本: {}", version, fallback);
        }
        "migrate" => {
            let version = arg(1, "version")?;
            let raw = store.load(version).await?;
            let outcome = LegacyMigrator::migrate(raw)?;
            if outcome.report.is_noop() {
                println!("{} 已是规范格式", version);
            } else {
                println!("{:#?}", outcome.report);
                let mut session = open_version(store, version).await?;
                session.save().await?;
                println!("已写回规范格式: {}", version);
            }
        }
        "set" => {
            let mut session = open_version(store, arg(1, "version")?).await?;
            let path = arg(2, "group.key")?;
            let value: f64 = arg(3, "value")?
                .trim()
                .parse()
                .with_context(|| format!("无法解析数值: {}", args[3]))?;
            session.set_weight(path, value)?;
            session.save().await?;
            println!("{} = {}", path, value);
        }
        "preview" => {
            let session = open_version(store, arg(1, "version")?).await?;
            let feature = arg(2, "feature")?;
            let input = args.get(3).map(String::as_str);
            match session.preview(feature, input)? {
                Some(score) => println!("{} => {:.3}", feature, score),
                None => println!("{} => (无法预览)", feature),
            }
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn required_arg<'a>(args: &'a [String], idx: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数 <{}>\n{}", name, USAGE))
}

/// 打开会话并确认加载的正是指定版本（加载失败时返回具体原因）
async fn open_version(store: Arc<dyn ProfileStore>, version: &str) -> anyhow::Result<ProfileSession> {
    let mut session = ProfileSession::open(store, Some(version)).await?;
    if session.current_version() != Some(version) {
        let err = match session.take_load_error() {
            Some(e) if session.known_versions().iter().any(|v| v == version) => e,
            _ => ProfileError::NotFound(version.to_string()),
        };
        return Err(anyhow::Error::new(err).context(format!("无法打开配置版本 {}", version)));
    }
    Ok(session)
}
