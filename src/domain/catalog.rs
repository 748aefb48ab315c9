// ==========================================
// 闲置商品监控 - 特征目录
// ==========================================
// 职责: 贝叶斯特征 / 视觉特征 / 样本向量维度的静态定义
// 用途: 迁移时为旧规则补全类型标签、校验时检查规则类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 样本特征向量维度
pub const SAMPLE_VECTOR_DIM: usize = 8;

/// 样本特征向量各维含义（顺序即向量下标）
pub const SAMPLE_VECTOR_FIELDS: [&str; SAMPLE_VECTOR_DIM] = [
    "seller_credit_level",
    "positive_rate",
    "seller_tenure",
    "sale_ratio",
    "image_count",
    "description_quality",
    "popularity",
    "category_concentration",
];

/// 在售/已售比公式参数（由外部融合引擎解释）
pub const SALES_RATIO_PARAMS: [&str; 7] = [
    "min_total_items",
    "low_ratio_threshold",
    "high_ratio_threshold",
    "base_score",
    "boost_factor",
    "penalty_factor",
    "max_score",
];

// ==========================================
// RuleKind - 评分规则类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    KeywordMapping, // 关键词映射
    RangeLadder,    // 数值阶梯
    Formula,        // 参数化公式
    Boolean,        // 布尔
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::KeywordMapping => "keyword_mapping",
            RuleKind::RangeLadder => "range_ladder",
            RuleKind::Formula => "formula",
            RuleKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// BayesianFeature - 贝叶斯特征
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BayesianFeature {
    SellerTenure,      // 卖家注册时长（月）
    PositiveRate,      // 好评率（%）
    SellerCreditLevel, // 信用等级
    SalesRatio,        // 在售/已售比
    UsedYears,         // 使用年限 / 成色
    Freshness,         // 发布新鲜度（天）
    HasGuarantee,      // 是否有担保
}

impl BayesianFeature {
    pub const ALL: [BayesianFeature; 7] = [
        BayesianFeature::SellerTenure,
        BayesianFeature::PositiveRate,
        BayesianFeature::SellerCreditLevel,
        BayesianFeature::SalesRatio,
        BayesianFeature::UsedYears,
        BayesianFeature::Freshness,
        BayesianFeature::HasGuarantee,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BayesianFeature::SellerTenure => "seller_tenure",
            BayesianFeature::PositiveRate => "positive_rate",
            BayesianFeature::SellerCreditLevel => "seller_credit_level",
            BayesianFeature::SalesRatio => "sales_ratio",
            BayesianFeature::UsedYears => "used_years",
            BayesianFeature::Freshness => "freshness",
            BayesianFeature::HasGuarantee => "has_guarantee",
        }
    }

    pub fn parse(key: &str) -> Option<BayesianFeature> {
        let key = key.trim();
        Self::ALL.iter().copied().find(|f| f.key() == key)
    }

    /// 该特征在目录中登记的规则类型
    pub fn rule_kind(&self) -> RuleKind {
        match self {
            BayesianFeature::SellerTenure
            | BayesianFeature::PositiveRate
            | BayesianFeature::Freshness => RuleKind::RangeLadder,
            BayesianFeature::SellerCreditLevel | BayesianFeature::UsedYears => {
                RuleKind::KeywordMapping
            }
            BayesianFeature::SalesRatio => RuleKind::Formula,
            BayesianFeature::HasGuarantee => RuleKind::Boolean,
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            BayesianFeature::SellerTenure => "卖家注册时长",
            BayesianFeature::PositiveRate => "好评率",
            BayesianFeature::SellerCreditLevel => "信用等级",
            BayesianFeature::SalesRatio => "在售/已售比",
            BayesianFeature::UsedYears => "使用年限",
            BayesianFeature::Freshness => "发布新鲜度",
            BayesianFeature::HasGuarantee => "担保交易",
        }
    }
}

impl fmt::Display for BayesianFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ==========================================
// VisualFeature - 视觉特征
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VisualFeature {
    ImageQuality, // 图片质量
    Condition,    // 成色
    Authenticity, // 真伪
    Completeness, // 图片完整度
}

impl VisualFeature {
    pub const ALL: [VisualFeature; 4] = [
        VisualFeature::ImageQuality,
        VisualFeature::Condition,
        VisualFeature::Authenticity,
        VisualFeature::Completeness,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            VisualFeature::ImageQuality => "image_quality",
            VisualFeature::Condition => "condition",
            VisualFeature::Authenticity => "authenticity",
            VisualFeature::Completeness => "completeness",
        }
    }

    pub fn parse(key: &str) -> Option<VisualFeature> {
        let key = key.trim();
        Self::ALL.iter().copied().find(|f| f.key() == key)
    }

    /// completeness 是线性插值规则，其余为关键词分组
    pub fn is_keyword_grouped(&self) -> bool {
        !matches!(self, VisualFeature::Completeness)
    }
}

impl fmt::Display for VisualFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_keys_round_trip() {
        for feature in BayesianFeature::ALL {
            assert_eq!(BayesianFeature::parse(feature.key()), Some(feature));
        }
        for feature in VisualFeature::ALL {
            assert_eq!(VisualFeature::parse(feature.key()), Some(feature));
        }
        assert_eq!(BayesianFeature::parse("unknown"), None);
    }

    #[test]
    fn test_rule_kind_catalog() {
        assert_eq!(BayesianFeature::SellerTenure.rule_kind(), RuleKind::RangeLadder);
        assert_eq!(BayesianFeature::SalesRatio.rule_kind(), RuleKind::Formula);
        assert_eq!(BayesianFeature::HasGuarantee.rule_kind(), RuleKind::Boolean);
        assert_eq!(
            BayesianFeature::SellerCreditLevel.rule_kind(),
            RuleKind::KeywordMapping
        );
    }
}
