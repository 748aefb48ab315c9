// ==========================================
// 闲置商品监控 - 配置存储接口
// ==========================================
// 职责: 定义配置版本的读写契约（不包含实现）
// 红线: 存储层不做迁移、不做校验，只搬运原始文档
// ==========================================

use crate::repository::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;

// ==========================================
// ProfileStore Trait
// ==========================================
// 实现者: SqliteProfileStore / FileProfileStore / InMemoryProfileStore
// 并发: 不提供乐观锁，后写覆盖先写
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// 读取指定版本的原始文档
    ///
    /// # 错误
    /// - StoreError::NotFound: 版本不存在
    async fn load(&self, version: &str) -> StoreResult<Value>;

    /// 保存文档（以文档的 version 字段为目标，存在则覆盖）
    async fn save(&self, document: &Value) -> StoreResult<()>;

    /// 列出全部版本标识（升序）
    async fn list_versions(&self) -> StoreResult<Vec<String>>;

    /// 删除指定版本
    ///
    /// # 错误
    /// - StoreError::NotFound: 版本不存在
    async fn delete(&self, version: &str) -> StoreResult<()>;
}

/// 读取文档中的 version 字段
pub fn document_version(document: &Value) -> StoreResult<String> {
    document
        .get("version")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidDocument("缺少 version 字段".to_string()))
}
