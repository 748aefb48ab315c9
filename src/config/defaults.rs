// ==========================================
// 闲置商品监控 - 默认融合评分配置
// ==========================================
// 用途: 新建版本 / 重置为默认值
// 约束: 四组权重之和均为 1.0，每个特征都有规则
// ==========================================

use crate::domain::catalog::{BayesianFeature, SALES_RATIO_PARAMS};
use crate::domain::profile::ConfigProfile;
use crate::domain::rules::{
    BooleanRule, CompletenessRule, ExtraFields, FormulaRule, KeywordGroup, KeywordGroupRule,
    KeywordMappingRule, KeywordRow, LadderRung, RangeLadderRule, ScoringRule, ScoringRules,
    VisualRules,
};
use crate::engine::rule_codec::split_keywords;
use std::collections::BTreeMap;

/// 在售/已售比公式的默认参数（与 SALES_RATIO_PARAMS 一一对应）
const SALES_RATIO_DEFAULTS: [f64; 7] = [5.0, 0.3, 3.0, 0.5, 0.3, 0.3, 1.0];

/// 默认配置（默认权重 + 全部默认规则 + 空样本）
pub fn default_profile(version: impl Into<String>) -> ConfigProfile {
    let mut profile = ConfigProfile::new(version);
    profile.scoring_rules = default_scoring_rules();
    profile
}

pub fn default_scoring_rules() -> ScoringRules {
    let features = BayesianFeature::ALL
        .iter()
        .map(|f| (f.key().to_string(), default_rule(*f)))
        .collect();

    ScoringRules {
        visual: default_visual_rules(),
        features,
    }
}

/// 单个特征的默认规则（类型与特征目录一致）
pub fn default_rule(feature: BayesianFeature) -> ScoringRule {
    match feature {
        // 月
        BayesianFeature::SellerTenure => ladder(
            &[
                (60.0, 1.0, "5年以上"),
                (24.0, 0.8, "2-5年"),
                (12.0, 0.6, "1-2年"),
                (6.0, 0.4, "半年-1年"),
                (0.0, 0.2, "半年以内"),
            ],
            Some(0.3),
            None,
        ),
        // 百分比
        BayesianFeature::PositiveRate => ladder(
            &[
                (99.0, 1.0, "99%以上"),
                (97.0, 0.8, "97%-99%"),
                (95.0, 0.6, "95%-97%"),
                (90.0, 0.4, "90%-95%"),
                (0.0, 0.1, "90%以下"),
            ],
            Some(0.3),
            Some(0.5),
        ),
        // 发布后天数，越新越好（阈值表示"至少已过去的天数"）
        BayesianFeature::Freshness => ladder(
            &[
                (0.0, 1.0, "3天内"),
                (3.0, 0.8, "3-7天"),
                (7.0, 0.6, "7-30天"),
                (30.0, 0.3, "30天以上"),
            ],
            Some(0.5),
            None,
        ),
        BayesianFeature::SellerCreditLevel => keywords(
            &[
                ("极好,优秀", 1.0, "信用极好"),
                ("良好", 0.7, "信用良好"),
                ("一般,中等", 0.4, "信用一般"),
                ("较差,差", 0.1, "信用较差"),
            ],
            Some(0.5),
            Some(0.5),
        ),
        BayesianFeature::UsedYears => keywords(
            &[
                ("全新,未拆封", 1.0, "全新"),
                ("99新,95新,九五新", 0.9, "几乎全新"),
                ("9成新,九成新,1年内", 0.7, "轻微使用"),
                ("8成新,八成新,1-2年", 0.5, "明显使用"),
                ("7成新,七成新,3年以上", 0.3, "老旧"),
            ],
            Some(0.5),
            Some(0.5),
        ),
        BayesianFeature::SalesRatio => {
            let parameters = SALES_RATIO_PARAMS
                .iter()
                .zip(SALES_RATIO_DEFAULTS)
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            ScoringRule::Formula(FormulaRule {
                parameters,
                ..FormulaRule::default()
            })
        }
        BayesianFeature::HasGuarantee => ScoringRule::Boolean(BooleanRule {
            description: "支持担保交易得 1 分，否则 0 分".to_string(),
            ..BooleanRule::default()
        }),
    }
}

pub fn default_visual_rules() -> VisualRules {
    VisualRules {
        image_quality: groups(
            &[
                ("high", "清晰,实拍,多角度", 1.0, "图片清晰"),
                ("mid", "一般,略模糊", 0.6, "图片一般"),
                ("low", "模糊,网图,截图", 0.2, "图片较差"),
            ],
            Some(0.5),
        ),
        condition: groups(
            &[
                ("high", "全新,无划痕,完好", 1.0, "成色好"),
                ("mid", "轻微划痕,正常使用痕迹", 0.6, "成色一般"),
                ("low", "明显磨损,破损,瑕疵", 0.2, "成色差"),
            ],
            Some(0.5),
        ),
        authenticity: groups(
            &[
                ("high", "正品,原装,有发票", 1.0, "可信"),
                ("mid", "无包装,无配件", 0.5, "存疑"),
                ("low", "高仿,复刻,A货", 0.0, "疑似仿品"),
            ],
            Some(0.5),
        ),
        completeness: CompletenessRule::default(),
        extra: ExtraFields::new(),
    }
}

fn ladder(
    rows: &[(f64, f64, &str)],
    default_score: Option<f64>,
    missing_score: Option<f64>,
) -> ScoringRule {
    ScoringRule::RangeLadder(RangeLadderRule {
        rungs: rows
            .iter()
            .map(|(min_threshold, score, description)| LadderRung {
                min_threshold: *min_threshold,
                score: *score,
                description: description.to_string(),
                extra: ExtraFields::new(),
            })
            .collect(),
        default_score,
        missing_score,
        extra: ExtraFields::new(),
    })
}

fn keywords(
    rows: &[(&str, f64, &str)],
    missing_score: Option<f64>,
    default_score: Option<f64>,
) -> ScoringRule {
    ScoringRule::KeywordMapping(KeywordMappingRule {
        rules: rows
            .iter()
            .map(|(kws, score, description)| KeywordRow {
                keywords: split_keywords(kws),
                score: *score,
                description: description.to_string(),
                extra: ExtraFields::new(),
            })
            .collect(),
        missing_score,
        default_score,
        extra: ExtraFields::new(),
    })
}

fn groups(rows: &[(&str, &str, f64, &str)], default_score: Option<f64>) -> KeywordGroupRule {
    let groups: BTreeMap<String, KeywordGroup> = rows
        .iter()
        .map(|(name, kws, score, description)| {
            (
                name.to_string(),
                KeywordGroup {
                    keywords: split_keywords(kws),
                    score: *score,
                    description: description.to_string(),
                    extra: ExtraFields::new(),
                },
            )
        })
        .collect();
    KeywordGroupRule {
        groups,
        default_score,
        extra: ExtraFields::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validator::WeightValidator;

    #[test]
    fn test_default_profile_is_valid_and_clean() {
        let profile = default_profile("default");
        let validator = WeightValidator::new();
        assert!(validator.validate(&profile).is_empty());
        assert!(
            validator.warnings(&profile).is_empty(),
            "{:?}",
            validator.warnings(&profile)
        );
    }

    #[test]
    fn test_every_feature_has_catalog_kind() {
        let rules = default_scoring_rules();
        for feature in BayesianFeature::ALL {
            let rule = rules.get(feature.key()).unwrap();
            assert_eq!(rule.kind(), feature.rule_kind(), "{}", feature);
        }
    }

    #[test]
    fn test_default_ladder_preview() {
        let ScoringRule::RangeLadder(rule) = default_rule(BayesianFeature::PositiveRate) else {
            panic!("positive_rate should be a ladder");
        };
        assert_eq!(rule.evaluate(Some("98%")), Some(0.8));
        assert_eq!(rule.evaluate(None), Some(0.5));
    }
}
