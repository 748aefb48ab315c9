// ==========================================
// 闲置商品监控 - 权重校验器
// ==========================================
// 红线: 四组权重之和必须为 1.0（绝对容差 0.001）
// 约束: 纯函数，不修改配置
// ==========================================

use crate::domain::catalog::{BayesianFeature, SALES_RATIO_PARAMS, SAMPLE_VECTOR_DIM};
use crate::domain::profile::ConfigProfile;
use crate::domain::rules::ScoringRule;
use crate::domain::sample::SampleBucket;
use crate::engine::error::{ProfileError, ProfileResult};

/// 权重和容差
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

pub struct WeightValidator {
    tolerance: f64,
}

impl Default for WeightValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightValidator {
    pub fn new() -> Self {
        Self {
            tolerance: WEIGHT_SUM_TOLERANCE,
        }
    }

    /// 检查四组权重之和
    ///
    /// # 返回
    /// - 空列表: 校验通过
    /// - 非空: 每组违规一条，包含实际和（三位小数）
    ///
    /// # 顺序
    /// weights → weights_no_visual → bayesian_features → visual_features
    pub fn validate(&self, profile: &ConfigProfile) -> Vec<String> {
        let groups = [
            ("weights", "融合权重", profile.weights.sum()),
            ("weights_no_visual", "无图融合权重", profile.weights_no_visual.sum()),
            ("bayesian_features", "贝叶斯特征权重", profile.bayesian_features.sum()),
            ("visual_features", "视觉特征权重", profile.visual_features.sum()),
        ];

        groups
            .iter()
            .filter(|(_, _, sum)| !self.sums_to_one(*sum))
            .map(|(key, title, sum)| {
                format!("{}({}) 之和必须为 1.0，当前为 {:.3}", title, key, sum)
            })
            .collect()
    }

    /// 保存前的强制校验
    pub fn ensure_valid(&self, profile: &ConfigProfile) -> ProfileResult<()> {
        let violations = self.validate(profile);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProfileError::ValidationError { violations })
        }
    }

    pub fn sums_to_one(&self, sum: f64) -> bool {
        (sum - 1.0).abs() < self.tolerance
    }

    /// 非阻断性提示（保存时记录日志，不阻止保存）
    pub fn warnings(&self, profile: &ConfigProfile) -> Vec<String> {
        let mut warnings = Vec::new();

        // 风险扣分
        let risk = &profile.risk_penalty;
        if risk.per_tag_penalty < 0 || risk.max_penalty < 0 {
            warnings.push(format!(
                "风险扣分不应为负数: per_tag_penalty={}, max_penalty={}",
                risk.per_tag_penalty, risk.max_penalty
            ));
        }
        if risk.per_tag_penalty > risk.max_penalty {
            warnings.push(format!(
                "单标签扣分 {} 大于扣分上限 {}",
                risk.per_tag_penalty, risk.max_penalty
            ));
        }

        // 规则类型与分数范围
        for (key, rule) in &profile.scoring_rules.features {
            match BayesianFeature::parse(key) {
                Some(feature) if feature.rule_kind() != rule.kind() => warnings.push(format!(
                    "{} 的规则类型为 {}，目录登记为 {}",
                    key,
                    rule.kind(),
                    feature.rule_kind()
                )),
                Some(_) => {}
                None => warnings.push(format!("未知特征的规则: {}", key)),
            }

            if rule.scores().iter().any(|s| !(0.0..=1.0).contains(s)) {
                warnings.push(format!("{} 的规则分数超出 [0, 1]", key));
            }

            if let ScoringRule::Formula(formula) = rule {
                if key == BayesianFeature::SalesRatio.key() {
                    let missing = formula.missing_parameters(&SALES_RATIO_PARAMS);
                    if !missing.is_empty() {
                        warnings.push(format!("{} 缺少公式参数: {}", key, missing.join(", ")));
                    }
                }
            }
        }

        let visual = &profile.scoring_rules.visual;
        for (key, group_rule) in [
            ("image_quality", &visual.image_quality),
            ("condition", &visual.condition),
            ("authenticity", &visual.authenticity),
        ] {
            if group_rule
                .groups
                .values()
                .any(|g| !(0.0..=1.0).contains(&g.score))
            {
                warnings.push(format!("visual.{} 的分组分数超出 [0, 1]", key));
            }
        }
        if !(0.0..=1.0).contains(&visual.completeness.min_score) {
            warnings.push("visual.completeness 的 min_score 超出 [0, 1]".to_string());
        }

        // 样本
        for bucket in SampleBucket::ALL {
            for (idx, sample) in profile.samples.bucket(bucket).iter().enumerate() {
                if sample.vector.len() != SAMPLE_VECTOR_DIM {
                    warnings.push(format!(
                        "{}[{}] '{}' 向量维度为 {}，期望 {}",
                        bucket,
                        idx,
                        sample.name,
                        sample.vector.len(),
                        SAMPLE_VECTOR_DIM
                    ));
                }
                if sample.label != bucket.label() {
                    warnings.push(format!(
                        "{}[{}] '{}' 标签为 {}，与所在桶不一致",
                        bucket, idx, sample.name, sample.label
                    ));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::FusionWeights;
    use crate::domain::sample::Sample;

    #[test]
    fn test_valid_weights_pass() {
        let mut profile = ConfigProfile::new("v1");
        profile.weights = FusionWeights {
            bayesian: 0.5,
            visual: 0.3,
            ai: 0.2,
            ..FusionWeights::default()
        };
        assert!(WeightValidator::new().validate(&profile).is_empty());
    }

    #[test]
    fn test_violation_reports_sum_with_three_decimals() {
        let mut profile = ConfigProfile::new("v1");
        profile.weights = FusionWeights {
            bayesian: 0.5,
            visual: 0.3,
            ai: 0.3,
            ..FusionWeights::default()
        };
        let violations = WeightValidator::new().validate(&profile);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("1.100"), "{}", violations[0]);
        assert!(violations[0].contains("(weights)"));
    }

    #[test]
    fn test_violations_follow_group_order() {
        let mut profile = ConfigProfile::new("v1");
        profile.visual_features.completeness = 0.5;
        profile.weights.ai = 0.0;
        let violations = WeightValidator::new().validate(&profile);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("(weights)"));
        assert!(violations[1].contains("(visual_features)"));
    }

    #[test]
    fn test_tolerance_boundary() {
        let validator = WeightValidator::new();
        assert!(validator.sums_to_one(1.0005));
        assert!(validator.sums_to_one(0.9995));
        assert!(!validator.sums_to_one(1.002));
        assert!(!validator.sums_to_one(0.998));
    }

    #[test]
    fn test_ensure_valid_carries_violations() {
        let mut profile = ConfigProfile::new("v1");
        profile.weights_no_visual.ai = 0.9;
        match WeightValidator::new().ensure_valid(&profile) {
            Err(ProfileError::ValidationError { violations }) => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("weights_no_visual"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_warnings_flag_short_vectors_and_negative_penalty() {
        let mut profile = ConfigProfile::new("v1");
        profile.risk_penalty.per_tag_penalty = -1;
        let mut sample = Sample::empty(SampleBucket::Trusted);
        sample.vector = vec![1.0, 0.5, 0.8];
        profile.samples.trusted.push(sample);

        let warnings = WeightValidator::new().warnings(&profile);
        assert!(warnings.iter().any(|w| w.contains("不应为负数")));
        assert!(warnings.iter().any(|w| w.contains("向量维度为 3")));
        assert!(WeightValidator::new().validate(&profile).is_empty());
    }
}
