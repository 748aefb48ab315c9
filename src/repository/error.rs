// ==========================================
// 闲置商品监控 - 配置存储错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 存储层错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("配置版本未找到: {0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("文档序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("无效的配置文档: {0}")]
    InvalidDocument(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("unknown".to_string()),
            rusqlite::Error::SqliteFailure(_, Some(msg)) => StoreError::Database(msg),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_error_mapping() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_io_and_serde_errors_convert() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("文件读写失败"));

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = parse.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
