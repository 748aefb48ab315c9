// ==========================================
// 闲置商品监控 - 样本仓库
// ==========================================
// 职责: 样本的增删、向量文本解析、编辑表格 ↔ 规范样本桶
// 红线: 每个样本都带标签；旧版镜像随规范样本同步重建
// ==========================================

use crate::domain::sample::{Sample, SampleBucket, SampleSet};
use crate::engine::migrator::LegacyCache;
use crate::engine::rule_codec::CollectWarning;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// 增删
// ==========================================

/// 追加空样本（新 ID、空向量、桶隐含标签），返回新样本下标
pub fn add_sample(samples: &mut SampleSet, bucket: SampleBucket) -> usize {
    let target = samples.bucket_mut(bucket);
    target.push(Sample::empty(bucket));
    target.len() - 1
}

/// 删除样本（需调用方确认）
///
/// # 返回
/// - Some(sample): 已删除
/// - None: 未确认或下标越界，样本集不变
pub fn delete_sample(
    samples: &mut SampleSet,
    bucket: SampleBucket,
    index: usize,
    confirm: impl FnOnce(&Sample) -> bool,
) -> Option<Sample> {
    let target = samples.bucket_mut(bucket);
    let sample = target.get(index)?;
    if !confirm(sample) {
        return None;
    }
    Some(target.remove(index))
}

// ==========================================
// 向量文本
// ==========================================

/// 逗号分隔文本 → 向量（无法解析的片段直接丢弃）
pub fn parse_vector(text: &str) -> Vec<f64> {
    parse_vector_checked(text).0
}

/// 同 parse_vector，额外返回被丢弃的片段
pub fn parse_vector_checked(text: &str) -> (Vec<f64>, Vec<String>) {
    let mut values = Vec::new();
    let mut dropped = Vec::new();
    for token in text.split([',', '，']).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            _ => dropped.push(token.to_string()),
        }
    }
    (values, dropped)
}

pub fn format_vector(vector: &[f64]) -> String {
    vector
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ==========================================
// 编辑表格
// ==========================================

/// 样本编辑行（向量为逗号分隔文本）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub bucket: SampleBucket,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vector: String,
    #[serde(default)]
    pub note: String,
}

pub fn to_rows(samples: &SampleSet) -> Vec<SampleRow> {
    SampleBucket::ALL
        .iter()
        .flat_map(|bucket| {
            samples.bucket(*bucket).iter().map(|s| SampleRow {
                bucket: *bucket,
                id: s.id.clone(),
                name: s.name.clone(),
                vector: format_vector(&s.vector),
                note: s.note.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CollectedSamples {
    pub samples: SampleSet,
    pub mirror: LegacyMirror,
    pub warnings: Vec<CollectWarning>,
}

/// 编辑表格 → 规范样本桶 + 旧版镜像
///
/// 标签由所在桶决定；缺 ID 的行分配新 ID；向量中无法解析的片段丢弃并记录警告
pub fn collect(rows: &[SampleRow], cache: &LegacyCache) -> CollectedSamples {
    let mut samples = SampleSet::default();
    let mut warnings = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let (vector, dropped) = parse_vector_checked(&row.vector);
        if !dropped.is_empty() {
            warnings.push(CollectWarning {
                field: format!("samples.{}[{}].vector", row.bucket, idx),
                raw: row.vector.clone(),
                message: format!("已丢弃无法解析的片段: {}", dropped.join(", ")),
            });
        }

        let id = match row.id.trim() {
            "" => uuid::Uuid::new_v4().to_string(),
            id => id.to_string(),
        };

        samples.bucket_mut(row.bucket).push(Sample {
            id,
            name: row.name.trim().to_string(),
            vector,
            label: row.bucket.label(),
            note: row.note.trim().to_string(),
        });
    }

    let mirror = legacy_mirror(&samples, cache);
    CollectedSamples {
        samples,
        mirror,
        warnings,
    }
}

// ==========================================
// LegacyMirror - 旧版样本镜像
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyMirror {
    pub trusted: Vec<Value>,
    pub untrusted: Vec<Value>,
}

impl LegacyMirror {
    /// 写入文档 samples 节点的旧版键（可信 / 不可信）
    pub fn attach(&self, document: &mut Value) {
        let Some(root) = document.as_object_mut() else {
            return;
        };
        let samples = root
            .entry("samples")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(samples) = samples.as_object_mut() else {
            return;
        };
        samples.insert(
            SampleBucket::Trusted.legacy_key().to_string(),
            Value::Array(self.trusted.clone()),
        );
        samples.insert(
            SampleBucket::Untrusted.legacy_key().to_string(),
            Value::Array(self.untrusted.clone()),
        );
    }

    /// 同步后的缓存（保存成功后替换会话中的 LegacyCache）
    pub fn into_cache(self) -> LegacyCache {
        LegacyCache {
            trusted: self.trusted,
            untrusted: self.untrusted,
        }
    }
}

/// 由规范样本重建旧版镜像
///
/// 按 ID、其次按 (name, note) 找到缓存中的原始条目，保留其额外字段
pub fn legacy_mirror(samples: &SampleSet, cache: &LegacyCache) -> LegacyMirror {
    let mut mirror = LegacyMirror::default();
    for bucket in SampleBucket::ALL {
        let cached = cache.bucket(bucket);
        let entries = samples
            .bucket(bucket)
            .iter()
            .map(|sample| mirror_entry(sample, cached))
            .collect();
        match bucket {
            SampleBucket::Trusted => mirror.trusted = entries,
            SampleBucket::Untrusted => mirror.untrusted = entries,
        }
    }
    mirror
}

fn mirror_entry(sample: &Sample, cached: &[Value]) -> Value {
    let field = |entry: &Value, key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);

    let original = cached
        .iter()
        .find(|entry| field(entry, "id").as_deref() == Some(sample.id.as_str()))
        .or_else(|| {
            cached.iter().find(|entry| {
                field(entry, "name").unwrap_or_default() == sample.name
                    && field(entry, "note").unwrap_or_default() == sample.note
            })
        });

    let mut entry = match original {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    entry.insert("id".to_string(), Value::from(sample.id.clone()));
    entry.insert("name".to_string(), Value::from(sample.name.clone()));
    entry.insert("vector".to_string(), Value::from(sample.vector.clone()));
    entry.insert("label".to_string(), Value::from(sample.label));
    entry.insert("note".to_string(), Value::from(sample.note.clone()));
    Value::Object(entry)
}
