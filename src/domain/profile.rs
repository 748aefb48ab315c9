// ==========================================
// 闲置商品监控 - 融合评分配置 (Bayes Profile)
// ==========================================
// 职责: 持久化与版本化的最小单元
// 红线: 每组权重之和必须为 1.0（容差见 engine::validator）
// ==========================================

use crate::domain::catalog::{BayesianFeature, VisualFeature};
use crate::domain::rules::{ExtraFields, ScoringRules};
use crate::domain::sample::SampleSet;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 版本名仅允许字母、数字、下划线、连字符
pub fn is_valid_version_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ==========================================
// FusionWeights - 融合权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub bayesian: f64,
    pub visual: f64,
    pub ai: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            bayesian: 0.4,
            visual: 0.3,
            ai: 0.3,
            extra: ExtraFields::new(),
        }
    }
}

impl FusionWeights {
    /// 无图片时使用的融合权重
    pub fn no_visual_default() -> Self {
        Self {
            bayesian: 0.6,
            visual: 0.0,
            ai: 0.4,
            extra: ExtraFields::new(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.bayesian + self.visual + self.ai
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut f64> {
        match key {
            "bayesian" => Some(&mut self.bayesian),
            "visual" => Some(&mut self.visual),
            "ai" => Some(&mut self.ai),
            _ => None,
        }
    }
}

// ==========================================
// BayesianFeatureWeights - 贝叶斯特征权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianFeatureWeights {
    pub seller_tenure: f64,
    pub positive_rate: f64,
    pub seller_credit_level: f64,
    pub sales_ratio: f64,
    pub used_years: f64,
    pub freshness: f64,
    pub has_guarantee: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for BayesianFeatureWeights {
    fn default() -> Self {
        Self {
            seller_tenure: 0.15,
            positive_rate: 0.20,
            seller_credit_level: 0.15,
            sales_ratio: 0.15,
            used_years: 0.10,
            freshness: 0.10,
            has_guarantee: 0.15,
            extra: ExtraFields::new(),
        }
    }
}

impl BayesianFeatureWeights {
    pub fn get(&self, feature: BayesianFeature) -> f64 {
        match feature {
            BayesianFeature::SellerTenure => self.seller_tenure,
            BayesianFeature::PositiveRate => self.positive_rate,
            BayesianFeature::SellerCreditLevel => self.seller_credit_level,
            BayesianFeature::SalesRatio => self.sales_ratio,
            BayesianFeature::UsedYears => self.used_years,
            BayesianFeature::Freshness => self.freshness,
            BayesianFeature::HasGuarantee => self.has_guarantee,
        }
    }

    pub fn slot_mut(&mut self, feature: BayesianFeature) -> &mut f64 {
        match feature {
            BayesianFeature::SellerTenure => &mut self.seller_tenure,
            BayesianFeature::PositiveRate => &mut self.positive_rate,
            BayesianFeature::SellerCreditLevel => &mut self.seller_credit_level,
            BayesianFeature::SalesRatio => &mut self.sales_ratio,
            BayesianFeature::UsedYears => &mut self.used_years,
            BayesianFeature::Freshness => &mut self.freshness,
            BayesianFeature::HasGuarantee => &mut self.has_guarantee,
        }
    }

    pub fn sum(&self) -> f64 {
        BayesianFeature::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

// ==========================================
// VisualFeatureWeights - 视觉特征权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualFeatureWeights {
    pub image_quality: f64,
    pub condition: f64,
    pub authenticity: f64,
    pub completeness: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for VisualFeatureWeights {
    fn default() -> Self {
        Self {
            image_quality: 0.30,
            condition: 0.30,
            authenticity: 0.25,
            completeness: 0.15,
            extra: ExtraFields::new(),
        }
    }
}

impl VisualFeatureWeights {
    pub fn get(&self, feature: VisualFeature) -> f64 {
        match feature {
            VisualFeature::ImageQuality => self.image_quality,
            VisualFeature::Condition => self.condition,
            VisualFeature::Authenticity => self.authenticity,
            VisualFeature::Completeness => self.completeness,
        }
    }

    pub fn slot_mut(&mut self, feature: VisualFeature) -> &mut f64 {
        match feature {
            VisualFeature::ImageQuality => &mut self.image_quality,
            VisualFeature::Condition => &mut self.condition,
            VisualFeature::Authenticity => &mut self.authenticity,
            VisualFeature::Completeness => &mut self.completeness,
        }
    }

    pub fn sum(&self) -> f64 {
        VisualFeature::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

// ==========================================
// RiskPenalty - 风险标签扣分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPenalty {
    /// 每个风险标签扣分
    pub per_tag_penalty: i64,
    /// 扣分上限
    pub max_penalty: i64,
    /// 如 enabled 等外部引擎使用的开关
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for RiskPenalty {
    fn default() -> Self {
        Self {
            per_tag_penalty: 10,
            max_penalty: 30,
            extra: ExtraFields::new(),
        }
    }
}

// ==========================================
// ConfigProfile - 配置版本
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProfile {
    /// 版本标识（同时是存储主键）
    pub version: String,

    #[serde(default)]
    pub weights: FusionWeights,

    #[serde(default = "FusionWeights::no_visual_default")]
    pub weights_no_visual: FusionWeights,

    #[serde(default)]
    pub bayesian_features: BayesianFeatureWeights,

    #[serde(default)]
    pub visual_features: VisualFeatureWeights,

    #[serde(default)]
    pub risk_penalty: RiskPenalty,

    #[serde(default)]
    pub scoring_rules: ScoringRules,

    #[serde(default)]
    pub samples: SampleSet,

    /// 最近一次保存时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,

    /// 未识别的顶层字段，保存时原样写回
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ConfigProfile {
    /// 以默认权重创建空规则、空样本的配置
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            weights: FusionWeights::default(),
            weights_no_visual: FusionWeights::no_visual_default(),
            bayesian_features: BayesianFeatureWeights::default(),
            visual_features: VisualFeatureWeights::default(),
            risk_penalty: RiskPenalty::default(),
            scoring_rules: ScoringRules::default(),
            samples: SampleSet::default(),
            updated_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// 按路径写入权重，路径形如 `weights.ai`、`bayesian_features.freshness`
    ///
    /// # 返回
    /// - true: 写入成功
    /// - false: 路径无法识别
    pub fn set_weight(&mut self, path: &str, value: f64) -> bool {
        let (group, key) = match path.trim().split_once('.') {
            Some(pair) => pair,
            None => return false,
        };

        let slot = match group {
            "weights" => self.weights.slot_mut(key),
            "weights_no_visual" => self.weights_no_visual.slot_mut(key),
            "bayesian_features" => {
                BayesianFeature::parse(key).map(|f| self.bayesian_features.slot_mut(f))
            }
            "visual_features" => {
                VisualFeature::parse(key).map(|f| self.visual_features.slot_mut(f))
            }
            _ => None,
        };

        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
