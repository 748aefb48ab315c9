// ==========================================
// 闲置商品监控 - 领域层
// ==========================================
// 职责: 融合评分配置的数据模型（无持久化、无业务流程）
// ==========================================

pub mod catalog;
pub mod profile;
pub mod rules;
pub mod sample;

pub use catalog::{BayesianFeature, RuleKind, VisualFeature, SAMPLE_VECTOR_DIM};
pub use profile::{
    is_valid_version_name, BayesianFeatureWeights, ConfigProfile, FusionWeights, RiskPenalty,
    VisualFeatureWeights,
};
pub use rules::{
    BooleanRule, CompletenessRule, ExtraFields, FormulaRule, KeywordGroup, KeywordGroupRule,
    KeywordMappingRule, KeywordRow, LadderRung, RangeLadderRule, ScoringRule, ScoringRules,
    VisualRules,
};
pub use sample::{Sample, SampleBucket, SampleSet};
