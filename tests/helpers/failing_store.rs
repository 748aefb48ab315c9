// ==========================================
// 可注入故障的存储 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use bayes_profile_engine::repository::{InMemoryProfileStore, StoreError, StoreResult};
use bayes_profile_engine::ProfileStore;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// 包装内存存储，可按开关让写入或列举失败
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryProfileStore,
    fail_saves: AtomicBool,
    fail_lists: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: InMemoryProfileStore) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for FailingStore {
    async fn load(&self, version: &str) -> StoreResult<Value> {
        self.inner.load(version).await
    }

    async fn save(&self, document: &Value) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Database("disk I/O error".to_string()));
        }
        self.inner.save(document).await
    }

    async fn list_versions(&self) -> StoreResult<Vec<String>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.list_versions().await
    }

    async fn delete(&self, version: &str) -> StoreResult<()> {
        self.inner.delete(version).await
    }
}
