// ==========================================
// 闲置商品监控 - 标注样本
// ==========================================
// 职责: 贝叶斯模型校准用的可信 / 不可信样本
// 红线: 每个样本都必须带标签（可信=1，不可信=0）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// SampleBucket - 样本桶
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleBucket {
    Trusted,   // 可信
    Untrusted, // 不可信
}

impl SampleBucket {
    pub const ALL: [SampleBucket; 2] = [SampleBucket::Trusted, SampleBucket::Untrusted];

    /// 桶隐含的标签
    pub fn label(&self) -> u8 {
        match self {
            SampleBucket::Trusted => 1,
            SampleBucket::Untrusted => 0,
        }
    }

    /// 规范键名
    pub fn key(&self) -> &'static str {
        match self {
            SampleBucket::Trusted => "trusted",
            SampleBucket::Untrusted => "untrusted",
        }
    }

    /// 旧版键名（旧消费者仍按此读取）
    pub fn legacy_key(&self) -> &'static str {
        match self {
            SampleBucket::Trusted => "可信",
            SampleBucket::Untrusted => "不可信",
        }
    }

    /// 同时接受规范键名与旧版键名
    pub fn parse(s: &str) -> Option<SampleBucket> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.key().eq_ignore_ascii_case(s) || b.legacy_key() == s)
    }
}

impl fmt::Display for SampleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ==========================================
// Sample - 样本
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// 特征向量（期望维度见 catalog::SAMPLE_VECTOR_DIM）
    #[serde(default)]
    pub vector: Vec<f64>,

    pub label: u8,

    #[serde(default)]
    pub note: String,
}

impl Sample {
    /// 新建空样本（新 ID、空向量、桶隐含标签）
    pub fn empty(bucket: SampleBucket) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            vector: Vec::new(),
            label: bucket.label(),
            note: String::new(),
        }
    }

    /// 去重签名 (name, note)
    pub fn signature(&self) -> (&str, &str) {
        (self.name.as_str(), self.note.as_str())
    }
}

// ==========================================
// SampleSet - 两个样本桶
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleSet {
    #[serde(default)]
    pub trusted: Vec<Sample>,

    #[serde(default)]
    pub untrusted: Vec<Sample>,
}

impl SampleSet {
    pub fn bucket(&self, bucket: SampleBucket) -> &Vec<Sample> {
        match bucket {
            SampleBucket::Trusted => &self.trusted,
            SampleBucket::Untrusted => &self.untrusted,
        }
    }

    pub fn bucket_mut(&mut self, bucket: SampleBucket) -> &mut Vec<Sample> {
        match bucket {
            SampleBucket::Trusted => &mut self.trusted,
            SampleBucket::Untrusted => &mut self.untrusted,
        }
    }

    pub fn len(&self) -> usize {
        self.trusted.len() + self.untrusted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
