// ==========================================
// 闲置商品监控 - 目录配置存储
// ==========================================
// 存储: 每个版本一个 `<version>.json`（UTF-8，缩进格式）
// 约束: 版本名必须通过字符集校验，防止路径穿越
// 约束: 保存失败时不留下临时文件
// ==========================================

use crate::domain::profile::is_valid_version_name;
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::profile_store::{document_version, ProfileStore};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 配置文件后缀
pub const PROFILE_FILE_SUFFIX: &str = ".json";

pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, version: &str) -> StoreResult<PathBuf> {
        if !is_valid_version_name(version) {
            return Err(StoreError::InvalidDocument(format!(
                "非法版本名: '{}'",
                version
            )));
        }
        Ok(self.dir.join(format!("{}{}", version, PROFILE_FILE_SUFFIX)))
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn load(&self, version: &str) -> StoreResult<Value> {
        let path = self.path_for(version)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(version.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &Value) -> StoreResult<()> {
        let version = document_version(document)?;
        let path = self.path_for(&version)?;
        let text = serde_json::to_string_pretty(document)?;

        tokio::fs::create_dir_all(&self.dir).await?;

        // 先写临时文件再改名，避免读到半截文件
        let tmp = self.dir.join(format!(".{}{}.tmp", version, PROFILE_FILE_SUFFIX));
        let written = match tokio::fs::write(&tmp, text.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            discard_tmp(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn list_versions(&self) -> StoreResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(PROFILE_FILE_SUFFIX) {
                if is_valid_version_name(stem) {
                    versions.push(stem.to_string());
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    async fn delete(&self, version: &str) -> StoreResult<()> {
        let path = self.path_for(version)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(version.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn discard_tmp(tmp: &Path) {
    match tokio::fs::remove_file(tmp).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp.display(), error = %e, "临时文件清理失败"),
    }
}
