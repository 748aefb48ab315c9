// ==========================================
// 闲置商品监控 - 评分规则模型
// ==========================================
// 职责: 每个特征的评分规则（原始信号 → 0~1 归一化分数）
// 存储: 配置文档 scoring_rules 节点，按 "type" 标签区分规则类型
// ==========================================

use crate::domain::catalog::RuleKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 未识别字段（加载时收集，保存时原样写回）
pub type ExtraFields = BTreeMap<String, Value>;

// ==========================================
// 关键词映射规则
// ==========================================

/// 关键词映射行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub score: f64,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl KeywordRow {
    /// 输入文本包含任一非空关键词即视为命中
    pub fn matches(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .any(|k| !k.is_empty() && text.contains(k))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeywordMappingRule {
    #[serde(default)]
    pub rules: Vec<KeywordRow>,

    /// 信号缺失时的分数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_score: Option<f64>,

    /// 没有任何行命中时的分数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_score: Option<f64>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl KeywordMappingRule {
    /// 预览评分：按存储顺序取第一条命中的行
    pub fn evaluate(&self, input: Option<&str>) -> Option<f64> {
        let text = match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(t) => t,
            None => return self.missing_score.or(self.default_score),
        };

        self.rules
            .iter()
            .find(|row| row.matches(text))
            .map(|row| row.score)
            .or(self.default_score)
    }
}

// ==========================================
// 数值阶梯规则
// ==========================================

/// 阶梯档位：输入 >= min_threshold 时命中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderRung {
    pub min_threshold: f64,
    pub score: f64,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeLadderRule {
    #[serde(default)]
    pub rungs: Vec<LadderRung>,

    /// 未命中任何档位或输入无法解析时的分数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_score: Option<f64>,

    /// 输入缺失时的分数（未设置则回退到 default_score）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_score: Option<f64>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl RangeLadderRule {
    /// 预览评分（文本输入）
    ///
    /// 允许带 `%` 后缀；无法解析时使用 default_score
    pub fn evaluate(&self, input: Option<&str>) -> Option<f64> {
        let raw = match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(r) => r,
            None => return self.missing_score.or(self.default_score),
        };

        match raw.trim_end_matches('%').trim().parse::<f64>() {
            Ok(value) if value.is_finite() => self.evaluate_value(value),
            _ => self.default_score,
        }
    }

    /// 预览评分（数值输入）：阈值 <= 输入的最高档位胜出
    ///
    /// 存储顺序不变，评估时才按阈值降序
    pub fn evaluate_value(&self, value: f64) -> Option<f64> {
        let mut ordered: Vec<&LadderRung> = self.rungs.iter().collect();
        ordered.sort_by(|a, b| b.min_threshold.total_cmp(&a.min_threshold));

        ordered
            .into_iter()
            .find(|rung| rung.min_threshold <= value)
            .map(|rung| rung.score)
            .or(self.default_score)
    }
}

// ==========================================
// 参数化公式规则 / 布尔规则
// ==========================================

/// 公式参数（本引擎只存储与校验，不求值）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormulaRule {
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,

    /// 非数值字段
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl FormulaRule {
    /// 缺失的必需参数
    pub fn missing_parameters<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.parameters.contains_key(*name))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BooleanRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl BooleanRule {
    /// 预览评分：真值得 1，假值得 0，无法识别为 None
    pub fn evaluate(&self, input: Option<&str>) -> Option<f64> {
        match input.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("true" | "1" | "yes" | "y" | "是" | "有") => Some(1.0),
            Some("false" | "0" | "no" | "n" | "否" | "无") => Some(0.0),
            _ => None,
        }
    }
}

// ==========================================
// ScoringRule - 评分规则（封闭标签联合）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringRule {
    KeywordMapping(KeywordMappingRule),
    RangeLadder(RangeLadderRule),
    Formula(FormulaRule),
    Boolean(BooleanRule),
}

impl ScoringRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            ScoringRule::KeywordMapping(_) => RuleKind::KeywordMapping,
            ScoringRule::RangeLadder(_) => RuleKind::RangeLadder,
            ScoringRule::Formula(_) => RuleKind::Formula,
            ScoringRule::Boolean(_) => RuleKind::Boolean,
        }
    }

    /// 规则级未识别字段
    pub fn extra(&self) -> &ExtraFields {
        match self {
            ScoringRule::KeywordMapping(rule) => &rule.extra,
            ScoringRule::RangeLadder(rule) => &rule.extra,
            ScoringRule::Formula(rule) => &rule.extra,
            ScoringRule::Boolean(rule) => &rule.extra,
        }
    }

    pub fn extra_mut(&mut self) -> &mut ExtraFields {
        match self {
            ScoringRule::KeywordMapping(rule) => &mut rule.extra,
            ScoringRule::RangeLadder(rule) => &mut rule.extra,
            ScoringRule::Formula(rule) => &mut rule.extra,
            ScoringRule::Boolean(rule) => &mut rule.extra,
        }
    }

    /// 规则中出现的全部分数（用于范围检查）
    pub fn scores(&self) -> Vec<f64> {
        match self {
            ScoringRule::KeywordMapping(rule) => rule
                .rules
                .iter()
                .map(|r| r.score)
                .chain(rule.missing_score)
                .chain(rule.default_score)
                .collect(),
            ScoringRule::RangeLadder(rule) => rule
                .rungs
                .iter()
                .map(|r| r.score)
                .chain(rule.missing_score)
                .chain(rule.default_score)
                .collect(),
            ScoringRule::Formula(_) | ScoringRule::Boolean(_) => Vec::new(),
        }
    }
}

// ==========================================
// 视觉子规则
// ==========================================

/// 关键词分组（如 high / mid / low）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub score: f64,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeywordGroupRule {
    #[serde(default)]
    pub groups: BTreeMap<String, KeywordGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_score: Option<f64>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl KeywordGroupRule {
    /// 预览评分：分数高的分组优先匹配
    pub fn evaluate(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() {
            return self.default_score;
        }

        let mut ordered: Vec<&KeywordGroup> = self.groups.values().collect();
        ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

        ordered
            .into_iter()
            .find(|g| {
                g.keywords
                    .iter()
                    .map(|k| k.trim())
                    .any(|k| !k.is_empty() && text.contains(k))
            })
            .map(|g| g.score)
            .or(self.default_score)
    }
}

/// 图片完整度：按图片数量线性插值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessRule {
    pub max_images: u32,
    pub min_score: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for CompletenessRule {
    fn default() -> Self {
        Self {
            max_images: 9,
            min_score: 0.2,
            extra: ExtraFields::new(),
        }
    }
}

impl CompletenessRule {
    /// min_score + (1 - min_score) * min(count, max) / max
    pub fn evaluate(&self, image_count: u32) -> f64 {
        if self.max_images == 0 {
            return 1.0;
        }
        let ratio = f64::from(image_count.min(self.max_images)) / f64::from(self.max_images);
        self.min_score + (1.0 - self.min_score) * ratio
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualRules {
    #[serde(default)]
    pub image_quality: KeywordGroupRule,
    #[serde(default)]
    pub condition: KeywordGroupRule,
    #[serde(default)]
    pub authenticity: KeywordGroupRule,
    #[serde(default)]
    pub completeness: CompletenessRule,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl VisualRules {
    pub fn group_rule(&self, key: &str) -> Option<&KeywordGroupRule> {
        match key {
            "image_quality" => Some(&self.image_quality),
            "condition" => Some(&self.condition),
            "authenticity" => Some(&self.authenticity),
            _ => None,
        }
    }

    pub fn group_rule_mut(&mut self, key: &str) -> Option<&mut KeywordGroupRule> {
        match key {
            "image_quality" => Some(&mut self.image_quality),
            "condition" => Some(&mut self.condition),
            "authenticity" => Some(&mut self.authenticity),
            _ => None,
        }
    }
}

// ==========================================
// ScoringRules - 规则集合
// ==========================================

/// 贝叶斯特征规则按特征名平铺，视觉子规则位于 `visual` 节点
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringRules {
    #[serde(default)]
    pub visual: VisualRules,

    #[serde(flatten)]
    pub features: BTreeMap<String, ScoringRule>,
}

impl ScoringRules {
    pub fn get(&self, feature: &str) -> Option<&ScoringRule> {
        self.features.get(feature)
    }
}
