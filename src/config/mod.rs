// ==========================================
// 闲置商品监控 - 配置层
// ==========================================
// 职责: 引擎运行参数（存储后端 / 路径 / 默认版本）与默认评分配置
// ==========================================

pub mod defaults;
pub mod engine_config;

pub use defaults::{default_profile, default_rule, default_scoring_rules, default_visual_rules};
pub use engine_config::{default_data_dir, env_keys, ConfigError, EngineConfig, StoreBackend};
