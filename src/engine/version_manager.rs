// ==========================================
// 闲置商品监控 - 配置版本管理
// ==========================================
// 职责: 版本列举 / 选择 / 加载 / 保存 / 复制 / 删除
// 红线: 不跟踪未保存状态（由 ProfileSession 负责）
// 红线: 唯一的版本不能删除
// ==========================================

use crate::domain::profile::ConfigProfile;
use crate::engine::error::{ProfileError, ProfileResult};
use crate::engine::migrator::{LegacyCache, LegacyMigrator, MigrationOutcome};
use crate::engine::validator::WeightValidator;
use crate::repository::profile_store::ProfileStore;
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub use crate::domain::profile::is_valid_version_name;

/// 旧版文件名后缀（用户可能连同后缀一起输入）
const LEGACY_NAME_SUFFIX: &str = ".json";

/// 版本名规范化：去首尾空白、去掉 `.json` 后缀
///
/// # 错误
/// - ProfileError::InvalidName: 规范化后为空
pub fn normalize_version_name(name: &str) -> ProfileResult<String> {
    let trimmed = name.trim();
    let stripped = trimmed
        .strip_suffix(LEGACY_NAME_SUFFIX)
        .unwrap_or(trimmed)
        .trim();
    if stripped.is_empty() {
        return Err(ProfileError::InvalidName(name.to_string()));
    }
    Ok(stripped.to_string())
}

/// 规范化并校验字符集
pub fn checked_version_name(name: &str) -> ProfileResult<String> {
    let normalized = normalize_version_name(name)?;
    if !is_valid_version_name(&normalized) {
        return Err(ProfileError::InvalidName(normalized));
    }
    Ok(normalized)
}

/// 首选版本存在则用之，否则取第一个已知版本
pub fn select_version(known: &[String], preferred: Option<&str>) -> Option<String> {
    preferred
        .and_then(|p| known.iter().find(|v| v.as_str() == p))
        .or_else(|| known.first())
        .cloned()
}

// ==========================================
// VersionManager
// ==========================================
pub struct VersionManager {
    store: Arc<dyn ProfileStore>,
    validator: WeightValidator,
}

impl VersionManager {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            validator: WeightValidator::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn validator(&self) -> &WeightValidator {
        &self.validator
    }

    /// 列出已知版本（升序）
    ///
    /// 存储不可达时退回到内存中当前配置的版本名（无则为空），并记录警告
    pub async fn list_versions(&self, in_memory: Option<&str>) -> Vec<String> {
        match self.try_list_versions().await {
            Ok(versions) => versions,
            Err(e) => {
                warn!(error = %e, "读取版本列表失败，使用内存中的版本");
                in_memory.map(|v| vec![v.to_string()]).unwrap_or_default()
            }
        }
    }

    pub async fn try_list_versions(&self) -> ProfileResult<Vec<String>> {
        let mut versions = self.store.list_versions().await?;
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    /// 加载并迁移指定版本
    pub async fn load(&self, version: &str) -> ProfileResult<MigrationOutcome> {
        let document = self.store.load(version).await?;
        let mut outcome = LegacyMigrator::migrate(document)?;

        if outcome.profile.version != version {
            warn!(
                requested = %version,
                stored = %outcome.profile.version,
                "文档内版本名与存储键不一致，以存储键为准"
            );
        }
        outcome.profile.version = version.to_string();

        if !outcome.report.is_noop() {
            info!(version = %version, report = ?outcome.report, "已迁移旧版配置");
        }
        Ok(outcome)
    }

    /// 校验并保存，返回写入的 updated_at
    ///
    /// 校验失败或存储失败时传入的配置不被修改
    pub async fn persist(
        &self,
        profile: &ConfigProfile,
        cache: &LegacyCache,
    ) -> ProfileResult<NaiveDateTime> {
        self.validator.ensure_valid(profile)?;

        for warning in self.validator.warnings(profile) {
            warn!(version = %profile.version, "{}", warning);
        }

        let now = Utc::now().naive_utc();
        let mut stamped = profile.clone();
        stamped.updated_at = Some(now);

        let document = LegacyMigrator::to_document(&stamped, cache)?;
        self.store.save(&document).await?;

        info!(version = %profile.version, "配置已保存");
        Ok(now)
    }

    /// 复制配置为新版本（源版本不受影响）
    ///
    /// # 错误
    /// - InvalidName / DuplicateName / ValidationError / PersistenceError
    pub async fn copy_version(
        &self,
        source: &ConfigProfile,
        cache: &LegacyCache,
        new_name: &str,
    ) -> ProfileResult<ConfigProfile> {
        let name = checked_version_name(new_name)?;

        let known = self.try_list_versions().await?;
        if known.iter().any(|v| *v == name) {
            return Err(ProfileError::DuplicateName(name));
        }

        let mut copy = source.clone();
        copy.version = name;
        copy.updated_at = None;

        let saved_at = self.persist(&copy, cache).await?;
        copy.updated_at = Some(saved_at);

        info!(source = %source.version, target = %copy.version, "配置已复制");
        Ok(copy)
    }

    /// 删除版本，返回回退版本（第一个其他已知版本）
    ///
    /// # 错误
    /// - LastVersionError: 仅剩这一个版本
    /// - NotFound: 版本不存在
    pub async fn delete_version(&self, name: &str) -> ProfileResult<String> {
        let known = self.try_list_versions().await?;
        if !known.iter().any(|v| v == name) {
            return Err(ProfileError::NotFound(name.to_string()));
        }

        let Some(fallback) = known.iter().find(|v| v.as_str() != name).cloned() else {
            return Err(ProfileError::LastVersionError(name.to_string()));
        };

        self.store.delete(name).await?;
        info!(version = %name, fallback = %fallback, "配置版本已删除");
        Ok(fallback)
    }
}
