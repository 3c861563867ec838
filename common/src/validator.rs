//! 학습 레코드 검증기
//!
//! 원시 한 줄 → 복구 파이프라인 → 필수 필드 확인 → output 양식 판별/검증.
//! 실패는 항상 구체적인 `RejectReason`으로 돌려준다.

use crate::parser::{parse_json_object, FENCE_RE};
use crate::taxonomy::Category;
use crate::types::{HardNegative, HardNegativeOutput, LegacyOutput, RecordOutput, TrainingRecord};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    static ref HANGUL_RE: Regex = Regex::new(r"[가-힣]").unwrap();
}

/// 외곽 레코드 필수 필드
pub const REQUIRED_FIELDS: [&str; 3] = ["instruction", "input", "output"];

/// 품질 검사 최소 글자 수 기본값
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

/// 거부 사유
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unparsable")]
    Unparsable,

    #[error("invalid utf-8")]
    InvalidUtf8,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field not string: {0}")]
    FieldNotString(&'static str),

    #[error("output unparsable")]
    OutputUnparsable,

    #[error("output not object")]
    OutputNotObject,

    #[error("category missing/too short")]
    CategoryTooShort,

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("hard_negative not object")]
    HardNegativeNotObject,

    #[error("missing output field: {0}")]
    MissingOutputField(&'static str),

    #[error("tags not sequence")]
    TagsNotSequence,

    #[error("too short: {field} ({len} chars)")]
    TooShort { field: &'static str, len: usize },

    #[error("no korean: {0}")]
    NoKorean(&'static str),
}

impl RejectReason {
    /// 집계용 고정 키
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::Unparsable => "unparsable",
            RejectReason::InvalidUtf8 => "invalid utf-8",
            RejectReason::MissingField(_) => "missing field",
            RejectReason::FieldNotString(_) => "field not string",
            RejectReason::OutputUnparsable => "output unparsable",
            RejectReason::OutputNotObject => "output not object",
            RejectReason::CategoryTooShort => "category missing/too short",
            RejectReason::UnknownCategory(_) => "unknown category",
            RejectReason::HardNegativeNotObject => "hard_negative not object",
            RejectReason::MissingOutputField(_) => "missing output field",
            RejectReason::TagsNotSequence => "tags not sequence",
            RejectReason::TooShort { .. } => "too short",
            RejectReason::NoKorean(_) => "no korean",
        }
    }
}

/// 검증 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// 길이/한글 포함 품질 검사 여부. 끄더라도 구조 검사와 카테고리 검사는 수행한다.
    pub check_quality: bool,
    pub min_text_chars: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_quality: true,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

/// 자유 텍스트 필드 정리: 코드 펜스 제거, 연속 공백(개행 포함) 축약, 앞뒤 공백 제거
///
/// 멱등: `normalize_text(normalize_text(s)) == normalize_text(s)`
pub fn normalize_text(text: &str) -> String {
    let without_fences = FENCE_RE.replace_all(text, "");
    without_fences.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 한글 음절 포함 여부
pub fn contains_hangul(text: &str) -> bool {
    HANGUL_RE.is_match(text)
}

/// 원시 한 줄을 기본 옵션으로 검증
pub fn validate_record(raw_line: &str) -> Result<TrainingRecord, RejectReason> {
    validate_record_with(raw_line, &ValidationOptions::default())
}

/// 원시 한 줄을 검증해서 정제된 레코드를 만든다
///
/// 복구 파이프라인으로 외곽 객체를 얻은 뒤 필수 필드와 output 양식을 검사한다.
/// instruction / input은 공백 정규화되고, output의 양식 밖 키는 보존된다.
///
/// # Arguments
/// * `raw_line` - 생성기가 출력한 한 줄
/// * `options` - 품질 검사 여부와 최소 글자 수
///
/// # Returns
/// * `Ok(TrainingRecord)` - 검증 통과
/// * `Err(RejectReason)` - 첫 번째로 걸린 거부 사유
pub fn validate_record_with(
    raw_line: &str,
    options: &ValidationOptions,
) -> Result<TrainingRecord, RejectReason> {
    let value = parse_json_object(raw_line).map_err(|_| RejectReason::Unparsable)?;
    let Value::Object(mut record) = value else {
        return Err(RejectReason::Unparsable);
    };

    for field in REQUIRED_FIELDS {
        if !record.contains_key(field) {
            return Err(RejectReason::MissingField(field));
        }
    }

    let instruction = take_string(&mut record, "instruction")?;
    let input = take_string(&mut record, "input")?;
    let output_value = record.remove("output").unwrap_or(Value::Null);

    let output = validate_output(&output_value, options)?;

    Ok(TrainingRecord {
        instruction: normalize_text(&instruction),
        input: normalize_text(&input),
        output,
    })
}

fn take_string(record: &mut Map<String, Value>, field: &'static str) -> Result<String, RejectReason> {
    match record.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RejectReason::FieldNotString(field)),
        None => Err(RejectReason::MissingField(field)),
    }
}

/// output 값(JSON 문자열 또는 이미 파싱된 객체)을 검증하고 양식을 판별
pub fn validate_output(
    output: &Value,
    options: &ValidationOptions,
) -> Result<RecordOutput, RejectReason> {
    let parsed;
    let object = match output {
        Value::String(encoded) => {
            parsed = parse_json_object(encoded).map_err(|_| RejectReason::OutputUnparsable)?;
            parsed.as_object().ok_or(RejectReason::OutputNotObject)?
        }
        Value::Object(object) => object,
        _ => return Err(RejectReason::OutputNotObject),
    };

    let category = validate_category(object.get("category"))?;

    if let Some(hard_negative) = object.get("hard_negative") {
        validate_hard_negative(category, hard_negative, object, options)
            .map(RecordOutput::HardNegative)
    } else {
        validate_legacy(category, object, options).map(RecordOutput::Legacy)
    }
}

fn validate_category(value: Option<&Value>) -> Result<Category, RejectReason> {
    let label = match value {
        Some(Value::String(s)) => s.as_str(),
        None | Some(Value::Null) => "",
        Some(_) => return Err(RejectReason::FieldNotString("category")),
    };
    if label.chars().count() < 2 {
        return Err(RejectReason::CategoryTooShort);
    }
    Category::from_label(label).ok_or_else(|| RejectReason::UnknownCategory(label.to_string()))
}

/// `consumed`에 없는 키만 복사
fn remaining_keys(object: &Map<String, Value>, consumed: &[&str]) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| !consumed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn validate_legacy(
    category: Category,
    object: &Map<String, Value>,
    options: &ValidationOptions,
) -> Result<LegacyOutput, RejectReason> {
    let tags = object.get("tags").ok_or(RejectReason::MissingOutputField("tags"))?;
    let reasoning = object
        .get("reasoning")
        .ok_or(RejectReason::MissingOutputField("reasoning"))?;

    let tags = tags.as_array().ok_or(RejectReason::TagsNotSequence)?.clone();
    let reasoning = reasoning
        .as_str()
        .ok_or(RejectReason::FieldNotString("reasoning"))?;

    if options.check_quality {
        check_quality("reasoning", reasoning, options.min_text_chars)?;
    }

    Ok(LegacyOutput {
        category,
        tags,
        reasoning: reasoning.to_string(),
        extra: remaining_keys(object, &["category", "tags", "reasoning"]),
    })
}

fn validate_hard_negative(
    category: Category,
    value: &Value,
    output: &Map<String, Value>,
    options: &ValidationOptions,
) -> Result<HardNegativeOutput, RejectReason> {
    let object = value.as_object().ok_or(RejectReason::HardNegativeNotObject)?;

    let confusing = object
        .get("confusing")
        .ok_or(RejectReason::MissingOutputField("hard_negative.confusing"))?;
    let reason = object
        .get("reason")
        .ok_or(RejectReason::MissingOutputField("hard_negative.reason"))?;

    let confusing = confusing
        .as_str()
        .ok_or(RejectReason::FieldNotString("hard_negative.confusing"))?;
    let reason = reason
        .as_str()
        .ok_or(RejectReason::FieldNotString("hard_negative.reason"))?;

    if options.check_quality {
        check_quality("hard_negative.reason", reason, options.min_text_chars)?;
    }

    Ok(HardNegativeOutput {
        category,
        hard_negative: HardNegative {
            confusing: confusing.to_string(),
            reason: reason.to_string(),
            extra: remaining_keys(object, &["confusing", "reason"]),
        },
        extra: remaining_keys(output, &["category", "hard_negative"]),
    })
}

fn check_quality(field: &'static str, text: &str, min_chars: usize) -> Result<(), RejectReason> {
    let len = text.chars().count();
    if len < min_chars {
        return Err(RejectReason::TooShort { field, len });
    }
    if !contains_hangul(text) {
        return Err(RejectReason::NoKorean(field));
    }
    Ok(())
}
