// ==========================================
// 闲置商品监控 - 评分规则编辑形态
// ==========================================
// 职责: 类型化规则 ↔ 字符串字段的编辑形态（无损往返）
// 说明: 数值字段无法解析时按兼容行为置 0（或置空），同时记录 CollectWarning
// 说明: 关键词中的逗号与反斜杠以 `\` 转义
// ==========================================

use crate::domain::rules::{
    BooleanRule, CompletenessRule, ExtraFields, FormulaRule, KeywordGroup, KeywordGroupRule,
    KeywordMappingRule, KeywordRow, LadderRung, RangeLadderRule, ScoringRule,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// 收集警告
// ==========================================

/// 编辑值被丢弃或强制转换时的提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectWarning {
    /// 字段路径，如 `seller_tenure.rows[1].score`
    pub field: String,
    /// 原始输入
    pub raw: String,
    pub message: String,
}

impl fmt::Display for CollectWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}（输入: '{}'）", self.field, self.message, self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub value: T,
    pub warnings: Vec<CollectWarning>,
}

// ==========================================
// 编辑行
// ==========================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeywordEditRow {
    pub description: String,
    /// 逗号分隔（支持全角逗号，`\,` 表示关键词内的逗号）
    pub keywords: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LadderEditRow {
    pub threshold: String,
    pub score: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamEditRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupEditRow {
    pub group: String,
    pub keywords: String,
    pub score: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditableRule {
    KeywordMapping {
        rows: Vec<KeywordEditRow>,
        missing_score: String,
        default_score: String,
    },
    RangeLadder {
        rows: Vec<LadderEditRow>,
        default_score: String,
        missing_score: String,
    },
    Formula {
        rows: Vec<ParamEditRow>,
    },
    Boolean {
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditableGroupRule {
    pub rows: Vec<GroupEditRow>,
    pub default_score: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditableCompleteness {
    pub max_images: String,
    pub min_score: String,
}

// ==========================================
// 关键词文本
// ==========================================

const KEYWORD_ESCAPE: char = '\\';

fn is_keyword_separator(c: char) -> bool {
    c == ',' || c == '，'
}

/// 按半角 / 全角逗号切分，去空白，丢弃空片段
///
/// `\,`、`\，`、`\\` 表示字面字符；其他位置的反斜杠原样保留
pub fn split_keywords(text: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == KEYWORD_ESCAPE {
            match chars.peek() {
                Some(&next) if next == KEYWORD_ESCAPE || is_keyword_separator(next) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(c),
            }
        } else if is_keyword_separator(c) {
            keywords.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    keywords.push(current);

    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// split_keywords 的逆操作
pub fn join_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| escape_keyword(k))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_keyword(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if c == KEYWORD_ESCAPE || is_keyword_separator(c) {
            escaped.push(KEYWORD_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

// ==========================================
// 数值收集
// ==========================================

struct FieldReader<'a> {
    prefix: &'a str,
    warnings: Vec<CollectWarning>,
}

impl<'a> FieldReader<'a> {
    fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, field: &str, raw: &str, message: &str) {
        self.warnings.push(CollectWarning {
            field: format!("{}.{}", self.prefix, field),
            raw: raw.to_string(),
            message: message.to_string(),
        });
    }

    /// 必填数值：无法解析时置 0
    fn number(&mut self, field: &str, raw: &str) -> f64 {
        match parse_number(raw) {
            Some(v) => v,
            None => {
                self.warn(field, raw, "无法解析为数值，已按 0 处理");
                0.0
            }
        }
    }

    /// 可选数值：空白为未设置，无法解析时置空
    fn optional(&mut self, field: &str, raw: &str) -> Option<f64> {
        if raw.trim().is_empty() {
            return None;
        }
        let parsed = parse_number(raw);
        if parsed.is_none() {
            self.warn(field, raw, "无法解析为数值，已置为未设置");
        }
        parsed
    }

    fn finish<T>(self, value: T) -> Collected<T> {
        Collected {
            value,
            warnings: self.warnings,
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn all_blank<S: AsRef<str>>(fields: &[S]) -> bool {
    fields.iter().all(|f| f.as_ref().trim().is_empty())
}

// ==========================================
// 贝叶斯特征规则
// ==========================================

pub fn to_editable(rule: &ScoringRule) -> EditableRule {
    match rule {
        ScoringRule::KeywordMapping(rule) => EditableRule::KeywordMapping {
            rows: rule
                .rules
                .iter()
                .map(|row| KeywordEditRow {
                    description: row.description.clone(),
                    keywords: join_keywords(&row.keywords),
                    score: row.score.to_string(),
                })
                .collect(),
            missing_score: format_optional(rule.missing_score),
            default_score: format_optional(rule.default_score),
        },
        ScoringRule::RangeLadder(rule) => EditableRule::RangeLadder {
            rows: rule
                .rungs
                .iter()
                .map(|rung| LadderEditRow {
                    threshold: rung.min_threshold.to_string(),
                    score: rung.score.to_string(),
                    description: rung.description.clone(),
                })
                .collect(),
            default_score: format_optional(rule.default_score),
            missing_score: format_optional(rule.missing_score),
        },
        ScoringRule::Formula(rule) => EditableRule::Formula {
            rows: rule
                .parameters
                .iter()
                .map(|(name, value)| ParamEditRow {
                    name: name.clone(),
                    value: value.to_string(),
                })
                .collect(),
        },
        ScoringRule::Boolean(rule) => EditableRule::Boolean {
            description: rule.description.clone(),
        },
    }
}

/// 编辑形态 → 类型化规则（全空白行跳过，行序保持不变）
pub fn collect_rule(feature: &str, editable: &EditableRule) -> Collected<ScoringRule> {
    let mut reader = FieldReader::new(feature);

    let rule = match editable {
        EditableRule::KeywordMapping {
            rows,
            missing_score,
            default_score,
        } => {
            let mut rules = Vec::new();
            for (idx, row) in rows.iter().enumerate() {
                if all_blank(&[&row.description, &row.keywords, &row.score]) {
                    continue;
                }
                rules.push(KeywordRow {
                    keywords: split_keywords(&row.keywords),
                    score: reader.number(&format!("rows[{}].score", idx), &row.score),
                    description: row.description.clone(),
                    extra: ExtraFields::new(),
                });
            }
            ScoringRule::KeywordMapping(KeywordMappingRule {
                rules,
                missing_score: reader.optional("missing_score", missing_score),
                default_score: reader.optional("default_score", default_score),
                extra: ExtraFields::new(),
            })
        }
        EditableRule::RangeLadder {
            rows,
            default_score,
            missing_score,
        } => {
            let mut rungs = Vec::new();
            for (idx, row) in rows.iter().enumerate() {
                if all_blank(&[&row.threshold, &row.score, &row.description]) {
                    continue;
                }
                rungs.push(LadderRung {
                    min_threshold: reader
                        .number(&format!("rows[{}].threshold", idx), &row.threshold),
                    score: reader.number(&format!("rows[{}].score", idx), &row.score),
                    description: row.description.clone(),
                    extra: ExtraFields::new(),
                });
            }
            ScoringRule::RangeLadder(RangeLadderRule {
                rungs,
                default_score: reader.optional("default_score", default_score),
                missing_score: reader.optional("missing_score", missing_score),
                extra: ExtraFields::new(),
            })
        }
        EditableRule::Formula { rows } => {
            let mut parameters = BTreeMap::new();
            for (idx, row) in rows.iter().enumerate() {
                if all_blank(&[&row.name, &row.value]) {
                    continue;
                }
                let name = row.name.trim();
                if name.is_empty() {
                    reader.warn(&format!("rows[{}].name", idx), &row.value, "参数名为空，已忽略");
                    continue;
                }
                let value = reader.number(&format!("parameters.{}", name), &row.value);
                parameters.insert(name.to_string(), value);
            }
            ScoringRule::Formula(FormulaRule {
                parameters,
                extra: ExtraFields::new(),
            })
        }
        EditableRule::Boolean { description } => ScoringRule::Boolean(BooleanRule {
            description: description.clone(),
            extra: ExtraFields::new(),
        }),
    };

    reader.finish(rule)
}

// ==========================================
// 视觉子规则
// ==========================================

pub fn group_rule_to_editable(rule: &KeywordGroupRule) -> EditableGroupRule {
    EditableGroupRule {
        rows: rule
            .groups
            .iter()
            .map(|(name, group)| GroupEditRow {
                group: name.clone(),
                keywords: join_keywords(&group.keywords),
                score: group.score.to_string(),
                description: group.description.clone(),
            })
            .collect(),
        default_score: format_optional(rule.default_score),
    }
}

/// 分组名重复时保留第一行
pub fn collect_group_rule(prefix: &str, editable: &EditableGroupRule) -> Collected<KeywordGroupRule> {
    let mut reader = FieldReader::new(prefix);
    let mut groups = BTreeMap::new();

    for (idx, row) in editable.rows.iter().enumerate() {
        if all_blank(&[&row.group, &row.keywords, &row.score, &row.description]) {
            continue;
        }
        let name = row.group.trim();
        if name.is_empty() {
            reader.warn(&format!("rows[{}].group", idx), &row.keywords, "分组名为空，已忽略");
            continue;
        }
        if groups.contains_key(name) {
            reader.warn(&format!("rows[{}].group", idx), name, "分组名重复，已忽略");
            continue;
        }
        let score = reader.number(&format!("groups.{}.score", name), &row.score);
        groups.insert(
            name.to_string(),
            KeywordGroup {
                keywords: split_keywords(&row.keywords),
                score,
                description: row.description.clone(),
                extra: ExtraFields::new(),
            },
        );
    }

    let default_score = reader.optional("default_score", &editable.default_score);
    reader.finish(KeywordGroupRule {
        groups,
        default_score,
        extra: ExtraFields::new(),
    })
}

pub fn completeness_to_editable(rule: &CompletenessRule) -> EditableCompleteness {
    EditableCompleteness {
        max_images: rule.max_images.to_string(),
        min_score: rule.min_score.to_string(),
    }
}

/// 无法解析的字段沿用默认值（9 张 / 0.2）
pub fn collect_completeness(
    prefix: &str,
    editable: &EditableCompleteness,
) -> Collected<CompletenessRule> {
    let mut reader = FieldReader::new(prefix);
    let defaults = CompletenessRule::default();

    let max_images = match editable.max_images.trim().parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            reader.warn(
                "max_images",
                &editable.max_images,
                "需要非负整数，已使用默认值",
            );
            defaults.max_images
        }
    };

    let min_score = match parse_number(&editable.min_score) {
        Some(v) => v,
        None => {
            reader.warn("min_score", &editable.min_score, "无法解析为数值，已使用默认值");
            defaults.min_score
        }
    };

    reader.finish(CompletenessRule {
        max_images,
        min_score,
        extra: ExtraFields::new(),
    })
}

// ==========================================
// 未识别字段沿用
// ==========================================
// 编辑形态只含可编辑字段，收集后的规则需从旧规则取回未识别字段

/// 同类型时沿用规则级字段；行数不变时按下标沿用行级字段
pub fn carry_extras(previous: &ScoringRule, collected: &mut ScoringRule) {
    if previous.kind() != collected.kind() {
        return;
    }
    *collected.extra_mut() = previous.extra().clone();

    match (previous, collected) {
        (ScoringRule::KeywordMapping(old), ScoringRule::KeywordMapping(new))
            if old.rules.len() == new.rules.len() =>
        {
            for (old_row, new_row) in old.rules.iter().zip(new.rules.iter_mut()) {
                new_row.extra = old_row.extra.clone();
            }
        }
        (ScoringRule::RangeLadder(old), ScoringRule::RangeLadder(new))
            if old.rungs.len() == new.rungs.len() =>
        {
            for (old_rung, new_rung) in old.rungs.iter().zip(new.rungs.iter_mut()) {
                new_rung.extra = old_rung.extra.clone();
            }
        }
        _ => {}
    }
}

/// 规则级字段整体沿用，分组字段按分组名沿用
pub fn carry_group_extras(previous: &KeywordGroupRule, collected: &mut KeywordGroupRule) {
    collected.extra = previous.extra.clone();
    for (name, group) in collected.groups.iter_mut() {
        if let Some(old) = previous.groups.get(name) {
            group.extra = old.extra.clone();
        }
    }
}
