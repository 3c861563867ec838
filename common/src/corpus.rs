//! 코퍼스 단위 정제 / 집계
//!
//! ## 처리 흐름
//! 1. 줄 단위 검증 (빈 줄은 건너뜀, 잘못된 줄은 집계만 하고 계속 진행)
//! 2. 동일 레코드 중복 제거 (먼저 나온 것 유지, 단일 스레드 병합)
//! 3. 사유별 거부 건수 집계
//!
//! 입력 소스 자체를 읽지 못하는 경우만 전체 실패로 처리한다.

use crate::error::Result;
use crate::taxonomy::{category_counts, Category};
use crate::types::TrainingRecord;
use crate::validator::{validate_record_with, RejectReason, ValidationOptions};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::io::BufRead;

/// 보고서에 남기는 거부 샘플 수
const MAX_REJECTION_SAMPLES: usize = 5;

/// 정제 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub validation: ValidationOptions,
    /// 완전히 같은 레코드 제거
    pub dedup: bool,
}

impl CleanOptions {
    /// `require_output_valid`가 false면 output 품질 검사를 생략한다
    pub fn new(require_output_valid: bool) -> Self {
        Self {
            validation: ValidationOptions {
                check_quality: require_output_valid,
                ..Default::default()
            },
            dedup: true,
        }
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 거부된 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// 1부터 시작하는 물리적 줄 번호
    pub line_number: usize,
    pub reason: RejectReason,
}

/// 정제 통계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// 빈 줄을 제외한 처리 레코드 수
    pub total_records: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    /// 거부 사유 종류 → 건수
    pub rejections: BTreeMap<&'static str, usize>,
    /// 앞쪽 거부 샘플
    pub samples: Vec<Rejection>,
}

impl CleanReport {
    /// (유효 건수, 무효 건수)
    pub fn counts(&self) -> (usize, usize) {
        (self.valid, self.invalid)
    }

    /// 유효 비율 (%)
    pub fn valid_percent(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.valid as f64 / self.total_records as f64 * 100.0
    }

    /// 건수 내림차순으로 정렬된 거부 사유
    pub fn rejections_by_count(&self) -> Vec<(&'static str, usize)> {
        let mut entries: Vec<_> = self.rejections.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

/// 정제 결과
#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    pub records: Vec<TrainingRecord>,
    pub report: CleanReport,
}

/// 검증 결과를 입력 순서대로 받아 중복 제거와 집계를 하는 단일 작성자
struct Merger {
    dedup: bool,
    seen: HashSet<String>,
    outcome: CleanOutcome,
}

impl Merger {
    fn new(options: &CleanOptions) -> Self {
        Self {
            dedup: options.dedup,
            seen: HashSet::new(),
            outcome: CleanOutcome::default(),
        }
    }

    fn push(&mut self, line_number: usize, result: std::result::Result<TrainingRecord, RejectReason>) {
        let report = &mut self.outcome.report;
        report.total_records += 1;

        match result {
            Ok(record) => {
                if self.dedup {
                    if let Some(key) = fingerprint(&record) {
                        if !self.seen.insert(key) {
                            tracing::debug!(line = line_number, "중복 레코드 제외");
                            report.duplicates += 1;
                            return;
                        }
                    }
                }
                report.valid += 1;
                self.outcome.records.push(record);
            }
            Err(reason) => {
                tracing::debug!(line = line_number, reason = %reason, "레코드 거부");
                report.invalid += 1;
                *report.rejections.entry(reason.kind()).or_insert(0) += 1;
                if report.samples.len() < MAX_REJECTION_SAMPLES {
                    report.samples.push(Rejection { line_number, reason });
                }
            }
        }
    }

    fn finish(self) -> CleanOutcome {
        let report = &self.outcome.report;
        tracing::info!(
            total = report.total_records,
            valid = report.valid,
            invalid = report.invalid,
            duplicates = report.duplicates,
            "코퍼스 정제 완료"
        );
        self.outcome
    }
}

/// 저장 형식 한 줄의 SHA-256
fn fingerprint(record: &TrainingRecord) -> Option<String> {
    match record.to_json_line() {
        Ok(line) => Some(hex::encode(Sha256::digest(line.as_bytes()))),
        Err(e) => {
            tracing::warn!(error = %e, "레코드 직렬화 실패, 중복 검사 생략");
            None
        }
    }
}

/// 한 물리적 줄 검사. 빈 줄이면 None.
fn check_line(
    bytes: &[u8],
    options: &ValidationOptions,
) -> Option<std::result::Result<TrainingRecord, RejectReason>> {
    let line = match std::str::from_utf8(bytes) {
        Ok(line) => line,
        Err(_) => return Some(Err(RejectReason::InvalidUtf8)),
    };
    if line.trim().is_empty() {
        return None;
    }
    Some(validate_record_with(line, options))
}

/// 줄 단위 입력을 정제한다
///
/// 잘못된 줄은 보고서에 집계만 하고 계속 진행한다.
///
/// # Arguments
/// * `reader` - JSON Lines 입력
/// * `options` - 검증 옵션과 중복 제거 여부
///
/// # Returns
/// * `Ok(CleanOutcome)` - 통과한 레코드(입력 순서)와 정제 통계
/// * `Err` - 입력 자체를 읽지 못한 경우
///
/// # Examples
/// ```
/// use moim_match_common::{clean_corpus, CleanOptions};
///
/// let corpus = "깨진 줄\n\n{\"instruction\":\"i\",\"input\":\"x\",\"output\":{\"category\":\"운동\",\"tags\":[],\"reasoning\":\"러닝화를 꾸준히 구매했습니다\"}}\n";
/// let outcome = clean_corpus(corpus.as_bytes(), &CleanOptions::default()).unwrap();
/// assert_eq!(outcome.report.counts(), (1, 1));
/// assert_eq!(outcome.report.total_records, 2);
/// ```
pub fn clean_corpus<R: BufRead>(reader: R, options: &CleanOptions) -> Result<CleanOutcome> {
    clean_corpus_with_progress(reader, options, |_| {})
}

/// 줄마다 진행 콜백을 부르면서 정제한다
pub fn clean_corpus_with_progress<R, F>(
    mut reader: R,
    options: &CleanOptions,
    mut on_line: F,
) -> Result<CleanOutcome>
where
    R: BufRead,
    F: FnMut(usize),
{
    let mut merger = Merger::new(options);
    let mut buffer = Vec::new();
    let mut line_number = 0;

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;
        on_line(line_number);

        if let Some(result) = check_line(&buffer, &options.validation) {
            merger.push(line_number, result);
        }
    }

    Ok(merger.finish())
}

/// 줄 단위 검증을 병렬로 수행한 뒤, 중복 제거와 집계는 입력 순서대로 한 번에 병합한다.
/// 결과는 `clean_corpus`와 동일하다.
#[cfg(feature = "parallel")]
pub fn clean_lines_parallel<L>(lines: &[L], options: &CleanOptions) -> CleanOutcome
where
    L: AsRef<[u8]> + Sync,
{
    use rayon::prelude::*;

    let checked: Vec<_> = lines
        .par_iter()
        .map(|line| check_line(line.as_ref(), &options.validation))
        .collect();

    let mut merger = Merger::new(options);
    for (index, result) in checked.into_iter().enumerate() {
        if let Some(result) = result {
            merger.push(index + 1, result);
        }
    }
    merger.finish()
}

/// 중복 판정 키 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordKey {
    Instruction,
    #[default]
    Input,
    Output,
}

impl RecordKey {
    fn value(&self, record: &TrainingRecord) -> String {
        match self {
            RecordKey::Instruction => record.instruction.clone(),
            RecordKey::Input => record.input.clone(),
            RecordKey::Output => serde_json::to_string(&record.output).unwrap_or_default(),
        }
    }
}

impl std::str::FromStr for RecordKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instruction" => Ok(RecordKey::Instruction),
            "input" => Ok(RecordKey::Input),
            "output" => Ok(RecordKey::Output),
            _ => Err(format!("Unknown key: {}. Use instruction, input, or output", s)),
        }
    }
}

/// 키가 처음 나온 항목만 입력 순서대로 남긴다
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// 지정 필드 기준 중복 제거
///
/// # Arguments
/// * `records` - 대상 레코드
/// * `key` - 비교할 필드
///
/// # Returns
/// 각 키 값이 처음 나온 레코드만 입력 순서대로 남긴 목록
pub fn remove_duplicates(records: Vec<TrainingRecord>, key: RecordKey) -> Vec<TrainingRecord> {
    dedup_by_key(records, |record| key.value(record))
}

/// 지정 카테고리의 레코드만 남긴다
pub fn filter_by_category<'a>(
    records: &'a [TrainingRecord],
    categories: &[Category],
) -> Vec<&'a TrainingRecord> {
    records
        .iter()
        .filter(|r| categories.contains(&r.category()))
        .collect()
}

/// 카테고리 분포 (0건 카테고리 포함)
pub fn category_distribution(records: &[TrainingRecord]) -> BTreeMap<Category, usize> {
    category_counts(records.iter().map(TrainingRecord::category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LegacyOutput, RecordOutput};

    fn record(input: &str, category: Category) -> TrainingRecord {
        TrainingRecord {
            instruction: "모임을 추천하세요".to_string(),
            input: input.to_string(),
            output: RecordOutput::Legacy(LegacyOutput {
                category,
                tags: vec![],
                reasoning: "충분히 긴 한국어 추천 사유".to_string(),
                extra: serde_json::Map::new(),
            }),
        }
    }

    fn valid_line(input: &str) -> String {
        format!(
            r#"{{"instruction":"i","input":"{}","output":"{{\"category\":\"운동\",\"tags\":[],\"reasoning\":\"충분히 긴 한국어 추천 사유\"}}"}}"#,
            input
        )
    }

    fn sample_corpus() -> String {
        [
            valid_line("a"),
            String::new(),
            "깨진 줄".to_string(),
            valid_line("b"),
            valid_line("a"),
            r#"{"instruction":"i","input":"x"}"#.to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn test_clean_corpus_counts() {
        let outcome = clean_corpus(sample_corpus().as_bytes(), &CleanOptions::default()).unwrap();
        let report = &outcome.report;
        assert_eq!(report.counts(), (2, 2));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.total_records, 5);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].input, "a");
        assert_eq!(outcome.records[1].input, "b");
    }

    #[test]
    fn test_clean_corpus_rejection_details() {
        let outcome = clean_corpus(sample_corpus().as_bytes(), &CleanOptions::default()).unwrap();
        let report = outcome.report;
        assert_eq!(report.rejections.get("unparsable"), Some(&1));
        assert_eq!(report.rejections.get("missing field"), Some(&1));
        assert_eq!(report.samples[0].line_number, 3);
        assert_eq!(report.samples[1].reason, RejectReason::MissingField("output"));
    }

    #[test]
    fn test_clean_corpus_without_dedup() {
        let options = CleanOptions { dedup: false, ..Default::default() };
        let outcome = clean_corpus(sample_corpus().as_bytes(), &options).unwrap();
        assert_eq!(outcome.report.counts(), (3, 2));
        assert_eq!(outcome.report.duplicates, 0);
    }

    #[test]
    fn test_clean_corpus_invalid_utf8_is_counted() {
        let mut bytes = valid_line("a").into_bytes();
        bytes.push(b'\n');
        bytes.extend_from_slice(&[0xff, 0xfe, b'{', b'}']);
        bytes.push(b'\n');
        bytes.extend_from_slice(valid_line("b").as_bytes());

        let outcome = clean_corpus(bytes.as_slice(), &CleanOptions::default()).unwrap();
        assert_eq!(outcome.report.counts(), (2, 1));
        assert_eq!(outcome.report.rejections.get("invalid utf-8"), Some(&1));
    }

    #[test]
    fn test_clean_corpus_progress_callback() {
        let mut seen = Vec::new();
        clean_corpus_with_progress(sample_corpus().as_bytes(), &CleanOptions::default(), |n| {
            seen.push(n)
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_clean_corpus_empty_input() {
        let outcome = clean_corpus(&b""[..], &CleanOptions::default()).unwrap();
        assert_eq!(outcome.report.counts(), (0, 0));
        assert_eq!(outcome.report.valid_percent(), 0.0);
    }

    #[test]
    fn test_clean_options_require_output_valid() {
        assert!(CleanOptions::new(true).validation.check_quality);
        assert!(!CleanOptions::new(false).validation.check_quality);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_clean_lines_parallel_matches_sequential() {
        let corpus = sample_corpus();
        let sequential = clean_corpus(corpus.as_bytes(), &CleanOptions::default()).unwrap();
        let lines: Vec<&str> = corpus.split('\n').collect();
        let parallel = clean_lines_parallel(&lines, &CleanOptions::default());
        assert_eq!(parallel.records, sequential.records);
        assert_eq!(parallel.report, sequential.report);
    }

    #[test]
    fn test_rejections_by_count() {
        let mut report = CleanReport::default();
        report.rejections.insert("too short", 1);
        report.rejections.insert("unparsable", 4);
        assert_eq!(report.rejections_by_count()[0], ("unparsable", 4));
    }

    // =============================================
    // remove_duplicates / 집계
    // =============================================

    #[test]
    fn test_remove_duplicates_first_seen_wins() {
        let mut first_a = record("a", Category::Sports);
        first_a.instruction = "첫 번째".to_string();
        let records = vec![first_a, record("b", Category::Pets), record("a", Category::Hobby)];

        let unique = remove_duplicates(records, RecordKey::Input);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].input, "a");
        assert_eq!(unique[0].instruction, "첫 번째");
        assert_eq!(unique[1].input, "b");
    }

    #[test]
    fn test_remove_duplicates_by_output() {
        let records = vec![record("a", Category::Sports), record("b", Category::Sports)];
        assert_eq!(remove_duplicates(records, RecordKey::Output).len(), 1);
    }

    #[test]
    fn test_dedup_by_key_generic() {
        let items = vec![3, 1, 3, 2, 1];
        assert_eq!(dedup_by_key(items, |x| *x), vec![3, 1, 2]);
    }

    #[test]
    fn test_record_key_from_str() {
        assert_eq!("INPUT".parse::<RecordKey>().unwrap(), RecordKey::Input);
        assert!("title".parse::<RecordKey>().is_err());
    }

    #[test]
    fn test_filter_by_category() {
        let records = vec![
            record("a", Category::Sports),
            record("b", Category::Pets),
            record("c", Category::Hobby),
        ];
        let filtered = filter_by_category(&records, &[Category::Pets, Category::Hobby]);
        let inputs: Vec<&str> = filtered.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(inputs, vec!["b", "c"]);
        assert!(filter_by_category(&records, &[]).is_empty());
    }

    #[test]
    fn test_category_distribution() {
        let records = vec![record("a", Category::Sports), record("b", Category::Sports)];
        let distribution = category_distribution(&records);
        assert_eq!(distribution.len(), Category::ALL.len());
        assert_eq!(distribution[&Category::Sports], 2);
        assert_eq!(distribution[&Category::FamilyParenting], 0);
    }
}
