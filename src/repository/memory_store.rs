// ==========================================
// 闲置商品监控 - 内存配置存储
// ==========================================
// 用途: 嵌入式使用 / 测试（进程退出即丢失）
// ==========================================

use crate::repository::error::{StoreError, StoreResult};
use crate::repository::profile_store::{document_version, ProfileStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryProfileStore {
    documents: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一组文档初始化（文档缺少 version 字段时报错）
    pub fn with_documents(documents: Vec<Value>) -> StoreResult<Self> {
        let mut map = BTreeMap::new();
        for doc in documents {
            map.insert(document_version(&doc)?, doc);
        }
        Ok(Self {
            documents: Mutex::new(map),
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.documents
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, version: &str) -> StoreResult<Value> {
        self.lock()?
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(version.to_string()))
    }

    async fn save(&self, document: &Value) -> StoreResult<()> {
        let version = document_version(document)?;
        self.lock()?.insert(version, document.clone());
        Ok(())
    }

    async fn list_versions(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn delete(&self, version: &str) -> StoreResult<()> {
        self.lock()?
            .remove(version)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(version.to_string()))
    }
}
