//! 레코드 타입 정의
//!
//! CLI와 라이브러리가 공유하는 타입:
//! - TrainingRecord: 정제된 학습 레코드 (output은 Legacy / HardNegative 중 하나)
//! - UserProfile: 분류기 응답에서 얻은 사용자 프로필
//! - MeetingRecord: 모임 카탈로그 항목
//! - MatchResult: 매칭 결과 (매 조회마다 새로 계산, 저장하지 않음)

use crate::taxonomy::{Category, TagDimension};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 태그 차원 이름 → 값
pub type TagMap = BTreeMap<String, String>;

/// output 스키마 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    Legacy,
    HardNegative,
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schema::Legacy => write!(f, "legacy"),
            Schema::HardNegative => write!(f, "hard_negative"),
        }
    }
}

/// 기존 양식: category + tags + reasoning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyOutput {
    pub category: Category,
    /// 태그 값은 이 계층에서 분류 체계 검사를 하지 않는다
    pub tags: Vec<Value>,
    pub reasoning: String,
    /// 양식 밖의 키 (그대로 다시 저장)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 혼동 카테고리와 그 이유
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardNegative {
    pub confusing: String,
    pub reason: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 하드 네거티브 양식: category + hard_negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardNegativeOutput {
    pub category: Category,
    pub hard_negative: HardNegative,
    /// 하드 네거티브 양식에 함께 온 tags / reasoning 등
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 학습 레코드 output (두 양식 중 정확히 하나)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordOutput {
    Legacy(LegacyOutput),
    HardNegative(HardNegativeOutput),
}

impl RecordOutput {
    pub fn category(&self) -> Category {
        match self {
            RecordOutput::Legacy(o) => o.category,
            RecordOutput::HardNegative(o) => o.category,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            RecordOutput::Legacy(_) => Schema::Legacy,
            RecordOutput::HardNegative(_) => Schema::HardNegative,
        }
    }
}

// 양식 판별은 hard_negative 키 존재 여부로만 한다
impl<'de> Deserialize<'de> for RecordOutput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("hard_negative").is_some() {
            serde_json::from_value(value)
                .map(RecordOutput::HardNegative)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(RecordOutput::Legacy)
                .map_err(de::Error::custom)
        }
    }
}

/// 정제된 학습 레코드
///
/// 저장 형식에서 `output`은 JSON 문자열로 인코딩된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub instruction: String,
    pub input: String,
    #[serde(with = "output_as_string")]
    pub output: RecordOutput,
}

impl TrainingRecord {
    pub fn category(&self) -> Category {
        self.output.category()
    }

    /// JSON Lines 한 줄로 직렬화 (한글은 이스케이프하지 않음)
    pub fn to_json_line(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

mod output_as_string {
    use super::RecordOutput;
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(output: &RecordOutput, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(output).map_err(ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    // 문자열 인코딩과 네이티브 객체 모두 허용
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RecordOutput, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(encoded) => serde_json::from_str(&encoded).map_err(de::Error::custom),
            other => serde_json::from_value(other).map_err(de::Error::custom),
        }
    }
}

/// 사용자 프로필
///
/// `category`는 원문 라벨을 그대로 보관한다. 알 수 없는 라벨은 매칭 단계에서
/// 빈 결과로 처리된다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl UserProfile {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, dimension: TagDimension, value: impl Into<String>) -> Self {
        self.tags.insert(dimension.name().to_string(), value.into());
        self
    }

    /// 인식 가능한 카테고리인 경우만 Some
    pub fn category(&self) -> Option<Category> {
        Category::from_label(&self.category)
    }

    pub fn tag(&self, dimension: TagDimension) -> Option<&str> {
        self.tags.get(dimension.name()).map(String::as_str)
    }
}

/// 모임 카탈로그 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: u64,
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub tags: TagMap,
}

impl MeetingRecord {
    pub fn tag(&self, dimension: TagDimension) -> Option<&str> {
        self.tags.get(dimension.name()).map(String::as_str)
    }
}

/// 차원별 일치 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionMatch {
    pub dimension: TagDimension,
    pub matched: bool,
}

impl DimensionMatch {
    /// 예: `숙련도(O)`, `분위기(X)`
    pub fn label(&self) -> String {
        format!("{}({})", self.dimension, if self.matched { "O" } else { "X" })
    }
}

/// 매칭 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub meeting: MeetingRecord,
    /// 0..=100, 25의 배수
    pub score: u32,
    /// 분류 체계 순서의 차원별 상세
    pub details: Vec<DimensionMatch>,
}

impl MatchResult {
    pub fn matched_count(&self) -> usize {
        self.details.iter().filter(|d| d.matched).count()
    }

    pub fn detail_labels(&self) -> Vec<String> {
        self.details.iter().map(DimensionMatch::label).collect()
    }
}
