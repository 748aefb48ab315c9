// ==========================================
// 闲置商品监控 - API 层
// ==========================================
// 职责: 面向调用方（管理命令 / 嵌入方）的配置编辑会话
// ==========================================

pub mod profile_session;

pub use crate::engine::error::{ProfileError, ProfileResult};
pub use profile_session::ProfileSession;
