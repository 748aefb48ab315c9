// ==========================================
// 闲置商品监控 - 融合评分配置引擎
// ==========================================
// 职责: 贝叶斯 / 视觉 / AI 三路融合评分配置的定义、校验、迁移与持久化
// 技术栈: Rust + SQLite（或 JSON 目录）
// 说明: 评分本身由外部推理引擎计算，本库只管理配置
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 配置模型
pub mod domain;

// 存储层 - 配置版本读写
pub mod repository;

// 引擎层 - 迁移 / 校验 / 版本管理
pub mod engine;

// 配置层 - 运行参数与默认配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 编辑会话
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    BayesianFeature, ConfigProfile, FusionWeights, RuleKind, Sample, SampleBucket, ScoringRule,
    VisualFeature,
};

pub use engine::{
    LegacyCache, LegacyMigrator, MigrationReport, ProfileError, ProfileResult, VersionManager,
    WeightValidator,
};

pub use repository::{
    FileProfileStore, InMemoryProfileStore, ProfileStore, SqliteProfileStore, StoreError,
};

pub use api::ProfileSession;

pub use config::{EngineConfig, StoreBackend};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "闲置商品监控 - 融合评分配置";
