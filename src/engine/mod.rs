// ==========================================
// 闲置商品监控 - 配置引擎层
// ==========================================
// 职责: 迁移、校验、规则编辑形态、样本仓库、版本管理
// 红线: Engine 不直接访问存储介质，只通过 ProfileStore
// ==========================================

pub mod error;
pub mod migrator;
pub mod rule_codec;
pub mod sample_repo;
pub mod validator;
pub mod version_manager;

pub use error::{ProfileError, ProfileResult};
pub use migrator::{LegacyCache, LegacyMigrator, MigrationOutcome, MigrationReport};
pub use rule_codec::{
    CollectWarning, Collected, EditableCompleteness, EditableGroupRule, EditableRule,
};
pub use sample_repo::{CollectedSamples, LegacyMirror, SampleRow};
pub use validator::{WeightValidator, WEIGHT_SUM_TOLERANCE};
pub use version_manager::{
    checked_version_name, is_valid_version_name, normalize_version_name, select_version,
    VersionManager,
};
