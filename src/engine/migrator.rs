// ==========================================
// 闲置商品监控 - 旧版配置迁移
// ==========================================
// 职责: 原始文档 → 规范 ConfigProfile
// - 旧样本桶（可信 / 不可信）并入规范桶，按 (name, note) 去重
// - seller_tenure 的 year_rules / month_rules 合并为按月阶梯
// - 缺少 type 标签的规则按特征目录补全
// - 视觉分组规则缺少 groups 节点时，把对象型条目收进 groups
// 红线: 幂等（对自身输出再次迁移不产生任何变化）
// ==========================================

use crate::domain::catalog::{BayesianFeature, RuleKind};
use crate::domain::profile::ConfigProfile;
use crate::domain::sample::{Sample, SampleBucket, SampleSet};
use crate::engine::error::{ProfileError, ProfileResult};
use crate::engine::sample_repo;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// LegacyCache - 旧版样本原始条目
// ==========================================
// 保存时据此回写同步的旧版镜像（保留旧条目上的额外字段）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyCache {
    pub trusted: Vec<Value>,
    pub untrusted: Vec<Value>,
}

impl LegacyCache {
    pub fn bucket(&self, bucket: SampleBucket) -> &Vec<Value> {
        match bucket {
            SampleBucket::Trusted => &self.trusted,
            SampleBucket::Untrusted => &self.untrusted,
        }
    }

    pub fn bucket_mut(&mut self, bucket: SampleBucket) -> &mut Vec<Value> {
        match bucket {
            SampleBucket::Trusted => &mut self.trusted,
            SampleBucket::Untrusted => &mut self.untrusted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty() && self.untrusted.is_empty()
    }
}

// ==========================================
// MigrationReport - 迁移记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// 从旧桶并入规范桶的样本数
    pub samples_merged: usize,
    /// 因 (name, note) 重复而跳过的旧样本数
    pub duplicates_skipped: usize,
    /// 补全了标签或 ID 的样本数
    pub labels_filled: usize,
    /// 转换为按月阶梯的 year/month 行数
    pub tenure_rows_converted: usize,
    /// 缺少 min_years / min_months（或非数值）而按 0 处理的行（如 "year_rules[1]"）
    pub tenure_rows_defaulted: Vec<String>,
    /// 补全 type 标签的规则（特征名）
    pub rules_tagged: Vec<String>,
    /// 无法识别而丢弃的无标签规则（特征名）
    pub rules_dropped: Vec<String>,
    /// 补上 groups 节点的视觉分组规则（如 "visual.condition"）
    pub groups_wrapped: Vec<String>,
}

impl MigrationReport {
    /// 文档已是规范形态（重复跳过不算变化）
    pub fn is_noop(&self) -> bool {
        self.samples_merged == 0
            && self.labels_filled == 0
            && self.tenure_rows_converted == 0
            && self.rules_tagged.is_empty()
            && self.rules_dropped.is_empty()
            && self.groups_wrapped.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub profile: ConfigProfile,
    pub cache: LegacyCache,
    pub report: MigrationReport,
}

// ==========================================
// LegacyMigrator
// ==========================================
pub struct LegacyMigrator;

impl LegacyMigrator {
    /// 迁移原始文档
    ///
    /// # 错误
    /// - ProfileError::InvalidDocument: 不是对象，或迁移后仍无法解码
    pub fn migrate(document: Value) -> ProfileResult<MigrationOutcome> {
        let mut root = match document {
            Value::Object(map) => map,
            other => {
                return Err(ProfileError::InvalidDocument(format!(
                    "顶层必须是对象，实际为 {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut report = MigrationReport::default();

        let (samples, cache) = migrate_samples(root.remove("samples"), &mut report)?;

        if let Some(Value::Object(rules)) = root.get_mut("scoring_rules") {
            migrate_rules(rules, &mut report);
            if let Some(Value::Object(visual)) = rules.get_mut("visual") {
                wrap_visual_groups(visual, &mut report);
            }
        }

        root.insert(
            "samples".to_string(),
            serde_json::to_value(&samples)
                .map_err(|e| ProfileError::InvalidDocument(e.to_string()))?,
        );

        let profile: ConfigProfile = serde_json::from_value(Value::Object(root))
            .map_err(|e| ProfileError::InvalidDocument(e.to_string()))?;

        debug!(
            version = %profile.version,
            samples_merged = report.samples_merged,
            duplicates_skipped = report.duplicates_skipped,
            tenure_rows = report.tenure_rows_converted,
            tenure_defaulted = report.tenure_rows_defaulted.len(),
            rules_tagged = report.rules_tagged.len(),
            groups_wrapped = report.groups_wrapped.len(),
            "配置迁移完成"
        );

        Ok(MigrationOutcome {
            profile,
            cache,
            report,
        })
    }

    /// 规范配置 → 待保存文档（附带同步的旧版样本镜像）
    pub fn to_document(profile: &ConfigProfile, cache: &LegacyCache) -> ProfileResult<Value> {
        let mut document = serde_json::to_value(profile)
            .map_err(|e| ProfileError::InvalidDocument(e.to_string()))?;
        sample_repo::legacy_mirror(&profile.samples, cache).attach(&mut document);
        Ok(document)
    }
}

// ==========================================
// 样本迁移
// ==========================================

fn migrate_samples(
    raw: Option<Value>,
    report: &mut MigrationReport,
) -> ProfileResult<(SampleSet, LegacyCache)> {
    let mut samples = SampleSet::default();
    let mut cache = LegacyCache::default();

    let mut raw = match raw {
        None | Some(Value::Null) => return Ok((samples, cache)),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ProfileError::InvalidDocument(format!(
                "samples 必须是对象，实际为 {}",
                json_type_name(&other)
            )))
        }
    };

    for bucket in SampleBucket::ALL {
        let canonical = take_array(&mut raw, bucket.key())?;
        let legacy = take_array(&mut raw, bucket.legacy_key())?;

        let target = samples.bucket_mut(bucket);
        for (idx, entry) in canonical.iter().enumerate() {
            let id_fallback = format!("{}_{}", bucket.key(), idx + 1);
            target.push(normalize_entry(entry, bucket, &id_fallback, report));
        }

        let mut seen: HashSet<(String, String)> = target
            .iter()
            .map(|s| (s.name.clone(), s.note.clone()))
            .collect();

        for (idx, entry) in legacy.iter().enumerate() {
            let id_fallback = format!("legacy_{}_{}", bucket.key(), idx + 1);
            let sample = normalize_entry(entry, bucket, &id_fallback, report);
            let signature = (sample.name.clone(), sample.note.clone());
            if seen.insert(signature) {
                report.samples_merged += 1;
                target.push(sample);
            } else {
                report.duplicates_skipped += 1;
            }
        }

        *cache.bucket_mut(bucket) = legacy;
    }

    Ok((samples, cache))
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> ProfileResult<Vec<Value>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ProfileError::InvalidDocument(format!(
            "samples.{} 必须是数组，实际为 {}",
            key,
            json_type_name(&other)
        ))),
    }
}

/// 单个样本条目 → Sample（缺标签补桶标签，缺 ID 补确定性 ID）
fn normalize_entry(
    entry: &Value,
    bucket: SampleBucket,
    id_fallback: &str,
    report: &mut MigrationReport,
) -> Sample {
    let text = |key: &str| -> Option<String> {
        match entry.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    };

    let mut filled = false;

    let id = match text("id").filter(|s| !s.trim().is_empty()) {
        Some(id) => id,
        None => {
            filled = true;
            id_fallback.to_string()
        }
    };

    let label = match entry.get("label").and_then(label_value) {
        Some(label) => label,
        None => {
            filled = true;
            bucket.label()
        }
    };

    if filled {
        report.labels_filled += 1;
    }

    let vector = match entry.get("vector") {
        Some(Value::Array(items)) => items.iter().filter_map(number_value).collect(),
        Some(Value::String(s)) => sample_repo::parse_vector(s),
        _ => Vec::new(),
    };

    Sample {
        id,
        name: text("name").unwrap_or_default(),
        vector,
        label,
        note: text("note").unwrap_or_default(),
    }
}

fn label_value(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }?;
    match n {
        0 => Some(0),
        1 => Some(1),
        _ => None,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

// ==========================================
// 规则迁移
// ==========================================

fn migrate_rules(rules: &mut Map<String, Value>, report: &mut MigrationReport) {
    let keys: Vec<String> = rules.keys().filter(|k| *k != "visual").cloned().collect();

    for key in keys {
        let Some(Value::Object(rule)) = rules.get_mut(&key) else {
            continue;
        };

        if key == BayesianFeature::SellerTenure.key() {
            report.tenure_rows_converted += merge_tenure_rows(rule, report);
        }

        if rule.contains_key("type") {
            continue;
        }

        match BayesianFeature::parse(&key) {
            Some(feature) => {
                tag_rule(rule, feature.rule_kind());
                report.rules_tagged.push(key.clone());
            }
            None => {
                debug!(feature = %key, "丢弃无法识别的无标签规则");
                rules.remove(&key);
                report.rules_dropped.push(key);
            }
        }
    }
}

/// year_rules（min_years × 12）与 month_rules 并入 rungs，保持原有顺序
///
/// 行上的其他字段随行带入阶梯
fn merge_tenure_rows(rule: &mut Map<String, Value>, report: &mut MigrationReport) -> usize {
    let year_rows = rule.remove("year_rules");
    let month_rows = rule.remove("month_rules");
    if year_rows.is_none() && month_rows.is_none() {
        return 0;
    }

    let mut rungs = match rule.remove("rungs") {
        Some(Value::Array(items)) => items,
        _ => match rule.remove("rules") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
    };

    let mut converted = 0;
    for (rows, list, field, factor) in [
        (year_rows, "year_rules", "min_years", 12.0),
        (month_rows, "month_rules", "min_months", 1.0),
    ] {
        let Some(Value::Array(rows)) = rows else {
            continue;
        };
        for (idx, row) in rows.into_iter().enumerate() {
            let mut rung = match row {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let threshold = match rung.remove(field).as_ref().and_then(number_value) {
                Some(value) => value * factor,
                None => {
                    let position = format!("{}[{}]", list, idx);
                    debug!(row = %position, field, "阶梯行缺少阈值，按 0 处理");
                    report.tenure_rows_defaulted.push(position);
                    0.0
                }
            };
            rung.insert("min_threshold".to_string(), Value::from(threshold));
            rung.entry("score").or_insert(Value::from(0.0));
            rungs.push(Value::Object(rung));
            converted += 1;
        }
    }

    rule.insert("rungs".to_string(), Value::Array(rungs));
    rule.insert(
        "type".to_string(),
        Value::from(RuleKind::RangeLadder.as_str()),
    );
    converted
}

/// 视觉分组规则的旧写法把分组直接挂在规则下：{"high": {...}, "default_score": 0.5}
fn wrap_visual_groups(visual: &mut Map<String, Value>, report: &mut MigrationReport) {
    for key in ["image_quality", "condition", "authenticity"] {
        let Some(Value::Object(rule)) = visual.get_mut(key) else {
            continue;
        };
        if rule.contains_key("groups") {
            continue;
        }

        let names: Vec<String> = rule
            .iter()
            .filter(|(_, v)| looks_like_group(v))
            .map(|(k, _)| k.clone())
            .collect();
        if names.is_empty() {
            continue;
        }

        let mut groups = Map::new();
        for name in names {
            if let Some(group) = rule.remove(&name) {
                groups.insert(name, group);
            }
        }
        rule.insert("groups".to_string(), Value::Object(groups));

        let path = format!("visual.{}", key);
        debug!(rule = %path, "视觉规则分组已收进 groups");
        report.groups_wrapped.push(path);
    }
}

fn looks_like_group(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|group| group.contains_key("score") || group.contains_key("keywords"))
}

/// 按目录登记的类型补全 type，并把旧字段挪到规范位置
fn tag_rule(rule: &mut Map<String, Value>, kind: RuleKind) {
    match kind {
        RuleKind::RangeLadder => {
            if !rule.contains_key("rungs") {
                if let Some(rows) = rule.remove("rules") {
                    rule.insert("rungs".to_string(), rows);
                }
            }
        }
        RuleKind::Formula => {
            if !rule.contains_key("parameters") {
                let names: Vec<String> = rule
                    .iter()
                    .filter(|(_, v)| v.is_number())
                    .map(|(k, _)| k.clone())
                    .collect();
                let mut parameters = Map::new();
                for name in names {
                    if let Some(v) = rule.remove(&name) {
                        parameters.insert(name, v);
                    }
                }
                rule.insert("parameters".to_string(), Value::Object(parameters));
            }
        }
        RuleKind::KeywordMapping | RuleKind::Boolean => {}
    }
    rule.insert("type".to_string(), Value::from(kind.as_str()));
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::ScoringRule;
    use serde_json::json;

    fn legacy_document() -> Value {
        json!({
            "version": "v1",
            "samples": {
                "trusted": [
                    {"id": "t1", "name": "A", "vector": [1,1,1,1,1,1,1,1], "label": 1, "note": ""}
                ],
                "可信": [
                    {"name": "A", "vector": [1,1,1,1,1,1,1,1], "note": ""},
                    {"name": "B", "vector": [0.9,1,1,1,1,1,1,1], "note": "", "source": "manual"}
                ],
                "不可信": [
                    {"name": "C", "vector": "0.1, 0.2, x", "note": "刷单"}
                ]
            },
            "scoring_rules": {
                "seller_tenure": {
                    "year_rules": [{"min_years": 2, "score": 0.8}],
                    "month_rules": [{"min_months": 6, "score": 0.5}],
                    "default_score": 0.2
                },
                "sales_ratio": {"min_total_items": 5, "base_score": 0.5},
                "has_guarantee": {}
            }
        })
    }

    #[test]
    fn test_legacy_samples_merge_by_signature() {
        let outcome = LegacyMigrator::migrate(legacy_document()).unwrap();
        let trusted = &outcome.profile.samples.trusted;
        assert_eq!(trusted.len(), 2);
        assert_eq!(trusted[0].id, "t1");
        assert_eq!(trusted[1].name, "B");
        assert_eq!(trusted[1].id, "legacy_trusted_2");
        assert_eq!(trusted[1].label, 1);

        let untrusted = &outcome.profile.samples.untrusted;
        assert_eq!(untrusted.len(), 1);
        assert_eq!(untrusted[0].label, 0);
        assert_eq!(untrusted[0].vector, vec![0.1, 0.2]);

        assert_eq!(outcome.report.samples_merged, 2);
        assert_eq!(outcome.report.duplicates_skipped, 1);
        assert_eq!(outcome.cache.trusted.len(), 2);
    }

    #[test]
    fn test_tenure_rows_become_month_rungs() {
        let outcome = LegacyMigrator::migrate(legacy_document()).unwrap();
        let Some(ScoringRule::RangeLadder(rule)) =
            outcome.profile.scoring_rules.get("seller_tenure")
        else {
            panic!("seller_tenure should be a range ladder");
        };
        assert_eq!(rule.rungs.len(), 2);
        assert_eq!(rule.rungs[0].min_threshold, 24.0);
        assert_eq!(rule.rungs[1].min_threshold, 6.0);
        assert_eq!(rule.default_score, Some(0.2));
        assert_eq!(rule.evaluate_value(30.0), Some(0.8));
        assert_eq!(outcome.report.tenure_rows_converted, 2);
    }

    #[test]
    fn test_untagged_rules_follow_catalog() {
        let outcome = LegacyMigrator::migrate(legacy_document()).unwrap();
        let Some(ScoringRule::Formula(formula)) = outcome.profile.scoring_rules.get("sales_ratio")
        else {
            panic!("sales_ratio should be a formula");
        };
        assert_eq!(formula.parameters.get("min_total_items"), Some(&5.0));
        assert!(matches!(
            outcome.profile.scoring_rules.get("has_guarantee"),
            Some(ScoringRule::Boolean(_))
        ));
        assert!(outcome.report.rules_tagged.contains(&"sales_ratio".to_string()));
    }

    #[test]
    fn test_tenure_rows_without_threshold_are_reported() {
        let outcome = LegacyMigrator::migrate(json!({
            "version": "v1",
            "scoring_rules": {
                "seller_tenure": {
                    "year_rules": [
                        {"min_years": 1, "score": 0.6, "source": "manual"},
                        {"score": 0.9}
                    ],
                    "month_rules": [{"min_months": "x", "score": 0.3}]
                }
            }
        }))
        .unwrap();

        assert_eq!(outcome.report.tenure_rows_converted, 3);
        assert_eq!(
            outcome.report.tenure_rows_defaulted,
            vec!["year_rules[1]".to_string(), "month_rules[0]".to_string()]
        );
        let Some(ScoringRule::RangeLadder(rule)) =
            outcome.profile.scoring_rules.get("seller_tenure")
        else {
            panic!("seller_tenure should be a range ladder");
        };
        assert_eq!(rule.rungs[0].min_threshold, 12.0);
        assert_eq!(rule.rungs[0].extra.get("source"), Some(&json!("manual")));
        assert_eq!(rule.rungs[1].min_threshold, 0.0);
        assert!(!outcome.report.is_noop());
    }

    #[test]
    fn test_unknown_nested_keys_survive_migration() {
        let outcome = LegacyMigrator::migrate(json!({
            "version": "v1",
            "weights": {"bayesian": 0.5, "visual": 0.3, "ai": 0.2, "note": "tuned"},
            "risk_penalty": {"per_tag_penalty": 5, "max_penalty": 20, "enabled": true},
            "scoring_rules": {
                "has_guarantee": {"type": "boolean", "note": "keep me"},
                "visual": {
                    "condition": {
                        "high": {"keywords": ["全新"], "score": 0.9, "color": "green"},
                        "low": {"keywords": ["破损"], "score": 0.1},
                        "default_score": 0.5
                    },
                    "completeness": {"max_images": 6, "min_score": 0.3, "note": "keep"}
                }
            }
        }))
        .unwrap();
        assert_eq!(outcome.report.groups_wrapped, vec!["visual.condition".to_string()]);

        let condition = &outcome.profile.scoring_rules.visual.condition;
        assert_eq!(condition.groups.len(), 2);
        assert_eq!(condition.default_score, Some(0.5));
        assert_eq!(condition.groups["high"].extra.get("color"), Some(&json!("green")));

        let document = LegacyMigrator::to_document(&outcome.profile, &outcome.cache).unwrap();
        assert_eq!(document["scoring_rules"]["has_guarantee"]["note"], json!("keep me"));
        assert_eq!(document["risk_penalty"]["enabled"], json!(true));
        assert_eq!(document["weights"]["note"], json!("tuned"));
        assert_eq!(
            document["scoring_rules"]["visual"]["completeness"]["note"],
            json!("keep")
        );

        let second = LegacyMigrator::migrate(document).unwrap();
        assert!(second.report.is_noop(), "{:?}", second.report);
        assert_eq!(second.profile, outcome.profile);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let first = LegacyMigrator::migrate(legacy_document()).unwrap();
        let document = LegacyMigrator::to_document(&first.profile, &first.cache).unwrap();

        let second = LegacyMigrator::migrate(document.clone()).unwrap();
        assert_eq!(second.profile, first.profile);
        assert!(second.report.is_noop(), "{:?}", second.report);

        let again = LegacyMigrator::to_document(&second.profile, &second.cache).unwrap();
        assert_eq!(again, document);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(matches!(
            LegacyMigrator::migrate(json!([1, 2])),
            Err(ProfileError::InvalidDocument(_))
        ));
        assert!(matches!(
            LegacyMigrator::migrate(json!({"weights": {}})),
            Err(ProfileError::InvalidDocument(_))
        ));
    }
}
