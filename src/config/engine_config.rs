// ==========================================
// 闲置商品监控 - 配置引擎运行参数
// ==========================================
// 职责: 选择存储后端与路径、默认版本名
// 来源: 环境变量 > 用户数据目录下的默认路径
// ==========================================

use crate::repository::{
    FileProfileStore, InMemoryProfileStore, ProfileStore, SqliteProfileStore, StoreResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// 环境变量键
pub mod env_keys {
    pub const BACKEND: &str = "BAYES_PROFILE_BACKEND";
    pub const DB_PATH: &str = "BAYES_PROFILE_DB_PATH";
    pub const PROFILE_DIR: &str = "BAYES_PROFILE_DIR";
    pub const DEFAULT_VERSION: &str = "BAYES_PROFILE_DEFAULT_VERSION";
    /// 日志格式: text（默认）/ json
    pub const LOG_FORMAT: &str = "BAYES_PROFILE_LOG_FORMAT";
}

pub const DEFAULT_DB_FILE: &str = "bayes_profile.db";
pub const DEFAULT_PROFILE_DIR: &str = "bayes_profiles";
pub const DEFAULT_VERSION_NAME: &str = "default";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未知的存储后端: '{0}'（可选: sqlite / file / memory）")]
    UnknownBackend(String),
}

// ==========================================
// StoreBackend - 存储后端
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            "file" | "dir" | "json" => Ok(StoreBackend::File),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::File => "file",
            StoreBackend::Memory => "memory",
        };
        f.write_str(s)
    }
}

// ==========================================
// EngineConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub db_path: PathBuf,
    pub profile_dir: PathBuf,
    #[serde(default = "default_version_name")]
    pub default_version: String,
}

fn default_version_name() -> String {
    DEFAULT_VERSION_NAME.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        let base = default_data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            backend: StoreBackend::default(),
            db_path: base.join(DEFAULT_DB_FILE),
            profile_dir: base.join(DEFAULT_PROFILE_DIR),
            default_version: default_version_name(),
        }
    }
}

impl EngineConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取（空白值视为未设置）
    pub fn with_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(backend) = get(env_keys::BACKEND) {
            config.backend = StoreBackend::parse(&backend)?;
        }
        if let Some(path) = get(env_keys::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = get(env_keys::PROFILE_DIR) {
            config.profile_dir = PathBuf::from(dir);
        }
        if let Some(version) = get(env_keys::DEFAULT_VERSION) {
            config.default_version = version;
        }
        Ok(config)
    }

    /// 按后端创建存储实例
    pub fn open_store(&self) -> StoreResult<Arc<dyn ProfileStore>> {
        info!(backend = %self.backend, "打开配置存储");
        let store: Arc<dyn ProfileStore> = match self.backend {
            StoreBackend::Sqlite => {
                let path = self.db_path.to_string_lossy();
                info!("使用数据库: {}", path);
                Arc::new(SqliteProfileStore::open(&path)?)
            }
            StoreBackend::File => {
                info!("使用配置目录: {}", self.profile_dir.display());
                Arc::new(FileProfileStore::new(self.profile_dir.clone()))
            }
            StoreBackend::Memory => Arc::new(InMemoryProfileStore::new()),
        };
        Ok(store)
    }
}

/// 用户数据目录（开发环境使用独立目录，避免污染生产数据）
pub fn default_data_dir() -> Option<PathBuf> {
    let data_dir = dirs::data_dir()?;

    #[cfg(debug_assertions)]
    let dir = data_dir.join("listing-monitor-dev");

    #[cfg(not(debug_assertions))]
    let dir = data_dir.join("listing-monitor");

    Some(dir)
}
