// ==========================================
// 闲置商品监控 - 配置存储层
// ==========================================
// 红线: Repository 不含业务逻辑（不迁移、不校验）
// ==========================================
// 职责: 提供配置版本的读写/列举/删除，屏蔽存储介质细节
// ==========================================

pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod profile_store;
pub mod sqlite_store;

pub use error::{StoreError, StoreResult};
pub use file_store::{FileProfileStore, PROFILE_FILE_SUFFIX};
pub use memory_store::InMemoryProfileStore;
pub use profile_store::{document_version, ProfileStore};
pub use sqlite_store::SqliteProfileStore;
