// ==========================================
// 闲置商品监控 - SQLite 配置存储
// ==========================================
// 存储: bayes_profile 表 (version 主键 + JSON 文档)
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_profile_schema, open_sqlite_connection};
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::profile_store::{document_version, ProfileStore};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    /// 打开数据库文件并建表
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（会再次应用统一 PRAGMA，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_profile_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 最近一次写入时间（数据库本地时间字符串）
    pub fn updated_at(&self, version: &str) -> StoreResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT updated_at FROM bayes_profile WHERE version = ?1",
                params![version],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn load(&self, version: &str) -> StoreResult<Value> {
        let raw = {
            let conn = self.get_conn()?;
            conn.query_row(
                "SELECT document FROM bayes_profile WHERE version = ?1",
                params![version],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        };

        match raw {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Err(StoreError::NotFound(version.to_string())),
        }
    }

    async fn save(&self, document: &Value) -> StoreResult<()> {
        let version = document_version(document)?;
        let text = serde_json::to_string(document)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO bayes_profile (version, document, updated_at)
            VALUES (?1, ?2, datetime('now', 'localtime'))
            ON CONFLICT(version) DO UPDATE SET
              document = ?2,
              updated_at = datetime('now', 'localtime')
            "#,
            params![version, text],
        )?;
        Ok(())
    }

    async fn list_versions(&self) -> StoreResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT version FROM bayes_profile ORDER BY version")?;
        let versions = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    async fn delete(&self, version: &str) -> StoreResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM bayes_profile WHERE version = ?1",
            params![version],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(version.to_string()));
        }
        Ok(())
    }
}
