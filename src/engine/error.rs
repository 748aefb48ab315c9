// ==========================================
// 闲置商品监控 - 配置引擎错误类型
// ==========================================
// 职责: 面向调用方的错误分类，存储层错误统一转换为 PersistenceError
// 说明: 所有错误均同步返回给发起方，不自动重试
// ==========================================

use crate::repository::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    // ===== 可在本地修正后重试 =====
    #[error("权重校验失败: {}", violations.join("; "))]
    ValidationError { violations: Vec<String> },

    #[error("版本名称已存在: {0}")]
    DuplicateName(String),

    #[error("无效的版本名称: '{0}'（仅允许字母、数字、下划线、连字符）")]
    InvalidName(String),

    #[error("未知特征: {0}")]
    UnknownFeature(String),

    // ===== 操作被拒绝，状态不变 =====
    #[error("不能删除唯一的配置版本: {0}")]
    LastVersionError(String),

    #[error("存在未保存的修改，操作已取消")]
    UnsavedChanges,

    #[error("当前没有已加载的配置")]
    NoProfileLoaded,

    // ===== 存储 / 文档 =====
    #[error("配置版本不存在: {0}")]
    NotFound(String),

    #[error("无效的配置文档: {0}")]
    InvalidDocument(String),

    #[error("持久化失败: {0}")]
    PersistenceError(String),
}

impl From<StoreError> for ProfileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(version) => ProfileError::NotFound(version),
            other => ProfileError::PersistenceError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ProfileResult<T> = Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: ProfileError = StoreError::NotFound("v9".to_string()).into();
        assert!(matches!(err, ProfileError::NotFound(ref v) if v == "v9"));

        let err: ProfileError = StoreError::Database("disk I/O error".to_string()).into();
        match err {
            ProfileError::PersistenceError(msg) => assert!(msg.contains("disk I/O error")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation_error_message_lists_violations() {
        let err = ProfileError::ValidationError {
            violations: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "权重校验失败: a; b");
    }
}
