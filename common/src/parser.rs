//! 생성기 응답 파서 / 복구 파이프라인
//!
//! 텍스트 생성기가 내보낸 JSON 유사 텍스트에서 JSON 객체를 복구한다.
//! 각 단계는 `&str -> Result<Value>` 순수 함수이며 첫 성공에서 멈춘다.
//!
//! 1. 마크다운 코드 펜스 / `<think>` 블록 제거 (전처리)
//! 2. 엄격 파싱
//! 3. 첫 `{` ~ 마지막 `}` 구간 추출 후 파싱
//! 4. 필드 복구 (따옴표 없는 reasoning 값, 후행 쉼표) 후 재파싱
//! 5. `"category"` 정규식 추출 (카테고리 전용 경로에서만 사용)

use crate::error::{Error, Result};
use crate::types::{TagMap, UserProfile};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

lazy_static! {
    pub static ref FENCE_RE: Regex = Regex::new(r"```[A-Za-z0-9_+-]*").unwrap();
    static ref THINK_RE: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    static ref UNQUOTED_REASONING_RE: Regex =
        Regex::new(r#""reasoning"\s*:\s*([^"{\[].+?)(\s*}\s*$)"#).unwrap();
    static ref TRAILING_COMMA_OBJ_RE: Regex = Regex::new(r",\s*}").unwrap();
    static ref TRAILING_COMMA_ARR_RE: Regex = Regex::new(r",\s*]").unwrap();
    static ref CATEGORY_FIELD_RE: Regex = Regex::new(r#""category"\s*:\s*"([^"]+)""#).unwrap();
}

/// 파싱 단계 시그니처
pub type Stage = fn(&str) -> Result<Value>;

/// 전체 레코드 경로의 파싱 단계 (순서 고정)
pub const OBJECT_STAGES: &[(&str, Stage)] = &[
    ("strict", parse_strict),
    ("bracketed", parse_bracketed),
    ("repaired", parse_repaired),
];

/// 코드 펜스(````json` 등)와 `<think>` 블록을 제거하고 앞뒤 공백을 정리
pub fn strip_markdown(text: &str) -> String {
    let without_think = THINK_RE.replace_all(text, "");
    FENCE_RE.replace_all(&without_think, "").trim().to_string()
}

/// 텍스트 전체를 하나의 JSON 객체로 파싱
pub fn parse_strict(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text.trim())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::Parse("JSON 객체가 아님".into()))
    }
}

/// 첫 `{`부터 마지막 `}`까지 잘라서 파싱 (앞뒤 설명문 제거)
pub fn parse_bracketed(text: &str) -> Result<Value> {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => parse_strict(&text[start..=end]),
        _ => Err(Error::Parse("JSON 객체를 찾을 수 없음".into())),
    }
}

/// 따옴표 없는 `"reasoning"` 값을 감싼다
///
/// 예: `"reasoning": 입문용 장비 위주 }` → `"reasoning": "입문용 장비 위주" }`
pub fn quote_unquoted_reasoning(text: &str) -> String {
    UNQUOTED_REASONING_RE
        .replace(text, |caps: &Captures| {
            let value = caps[1].trim();
            if value.ends_with('"') {
                return caps[0].to_string();
            }
            let quoted = Value::String(value.to_string()).to_string();
            format!("\"reasoning\": {}{}", quoted, &caps[2])
        })
        .into_owned()
}

/// `}` / `]` 앞의 후행 쉼표 제거
pub fn strip_trailing_commas(text: &str) -> String {
    let text = TRAILING_COMMA_OBJ_RE.replace_all(text, "}");
    TRAILING_COMMA_ARR_RE.replace_all(&text, "]").into_owned()
}

fn parse_structural(text: &str) -> Result<Value> {
    parse_strict(text).or_else(|_| parse_bracketed(text))
}

/// 필드 복구 후 재파싱. 복구마다 한 번씩 파싱을 시도한다.
pub fn parse_repaired(text: &str) -> Result<Value> {
    let quoted = quote_unquoted_reasoning(text);
    if quoted != text {
        if let Ok(value) = parse_structural(&quoted) {
            return Ok(value);
        }
    }

    let without_commas = strip_trailing_commas(&quoted);
    parse_structural(&without_commas)
        .map_err(|e| Error::Parse(format!("복구 후에도 파싱 실패: {}", e)))
}

/// `"category": "..."` 만 추출해서 최소 객체를 만든다
pub fn extract_category_field(text: &str) -> Result<Value> {
    let caps = CATEGORY_FIELD_RE
        .captures(text)
        .ok_or_else(|| Error::Parse("category 필드를 찾을 수 없음".into()))?;
    let mut object = Map::new();
    object.insert("category".to_string(), Value::String(caps[1].to_string()));
    Ok(Value::Object(object))
}

/// 마크다운 제거 후 1~4단계를 순서대로 시도
///
/// # Examples
/// ```
/// use moim_match_common::parse_json_object;
///
/// let value = parse_json_object("결과입니다: {\"category\": \"운동\",} 끝").unwrap();
/// assert_eq!(value["category"], "운동");
/// ```
pub fn parse_json_object(text: &str) -> Result<Value> {
    let stripped = strip_markdown(text);
    for (name, stage) in OBJECT_STAGES {
        match stage(&stripped) {
            Ok(value) => {
                tracing::trace!(stage = *name, "JSON 객체 파싱 성공");
                return Ok(value);
            }
            Err(e) => tracing::trace!(stage = *name, error = %e, "파싱 단계 실패"),
        }
    }
    Err(Error::Parse("unparsable".into()))
}

/// 1~4단계 실패 시 category 정규식 추출까지 시도 (카테고리 전용 경로)
pub fn parse_lenient(text: &str) -> Result<Value> {
    parse_json_object(text).or_else(|_| {
        let stripped = strip_markdown(text);
        extract_category_field(&stripped).map_err(|_| Error::Parse("unparsable".into()))
    })
}

/// 분류기 응답을 사용자 프로필로 변환
///
/// `tags` 객체의 문자열 값만 사용하고, `tags`가 없으면 빈 맵.
///
/// # Arguments
/// * `response` - 분류기 응답 원문 (설명문, 마크다운 펜스, `<think>` 블록 포함 가능)
///
/// # Returns
/// * `Ok(UserProfile)` - category 필드만 복구된 경우도 포함
/// * `Err` - JSON 객체도 category 필드도 찾지 못한 경우
pub fn parse_profile_response(response: &str) -> Result<UserProfile> {
    let value = parse_lenient(response)?;

    let category = value
        .get("category")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let tags: TagMap = value
        .get("tags")
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.trim().to_string())))
                .collect()
        })
        .unwrap_or_default();

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(UserProfile { category, tags, reasoning })
}
