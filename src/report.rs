//! 콘솔 출력 포맷
//!
//! `Display` 래퍼만 제공하고 출력은 호출 측에서 한다.

use moim_match_common::{Category, CleanReport, MatchResult, MeetingRecord, TagDimension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 정제 결과 요약
pub struct CleanSummary<'a>(pub &'a CleanReport);

impl fmt::Display for CleanSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "  전체 레코드: {}", report.total_records)?;
        writeln!(f, "  유효 데이터: {} ({:.1}%)", report.valid, report.valid_percent())?;
        writeln!(f, "  오류 데이터: {}", report.invalid)?;
        if report.duplicates > 0 {
            writeln!(f, "  중복 제거: {}", report.duplicates)?;
        }

        if !report.rejections.is_empty() {
            writeln!(f, "\n오류 유형별 집계:")?;
            for (kind, count) in report.rejections_by_count() {
                writeln!(f, "  - {}: {}건", kind, count)?;
            }
        }

        if !report.samples.is_empty() {
            writeln!(f, "\n오류 샘플:")?;
            for sample in &report.samples {
                writeln!(f, "  {}행: {}", sample.line_number, sample.reason)?;
            }
        }
        Ok(())
    }
}

/// 카테고리 분포 (비율 포함)
pub struct Distribution<'a>(pub &'a BTreeMap<Category, usize>);

impl fmt::Display for Distribution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.0.values().sum();
        for (category, count) in self.0 {
            let percent = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 * 100.0
            };
            writeln!(f, "  {:<8} {:>6} ({:.1}%)", category.label(), count, percent)?;
        }
        writeln!(f, "  {:<8} {:>6}", "합계", total)
    }
}

fn format_tags(meeting: &MeetingRecord) -> String {
    TagDimension::ALL
        .iter()
        .filter_map(|d| meeting.tag(*d))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 매칭 결과 (순위 / 매칭률 / 제목 / 태그 / 차원별 일치)
pub struct MatchList<'a>(pub &'a [MatchResult]);

impl fmt::Display for MatchList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "  추천할 모임이 없습니다");
        }

        for (rank, result) in self.0.iter().enumerate() {
            writeln!(
                f,
                "  {}. [{}%] {} ({})",
                rank + 1,
                result.score,
                result.meeting.title,
                result.meeting.category
            )?;
            let tags = format_tags(&result.meeting);
            if !tags.is_empty() {
                writeln!(f, "     태그: {}", tags)?;
            }
            writeln!(f, "     상세: {}", result.detail_labels().join(", "))?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct MatchJson<'a> {
    rank: usize,
    id: u64,
    title: &'a str,
    category: Category,
    score: u32,
    tags: &'a BTreeMap<String, String>,
    details: Vec<String>,
}

/// 매칭 결과를 JSON 배열로
pub fn matches_to_json(results: &[MatchResult]) -> serde_json::Result<String> {
    let rows: Vec<MatchJson<'_>> = results
        .iter()
        .enumerate()
        .map(|(index, result)| MatchJson {
            rank: index + 1,
            id: result.meeting.id,
            title: &result.meeting.title,
            category: result.meeting.category,
            score: result.score,
            tags: &result.meeting.tags,
            details: result.detail_labels(),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moim_match_common::{category_counts, DimensionMatch};

    fn sample_result() -> MatchResult {
        let mut tags = BTreeMap::new();
        tags.insert("숙련도".to_string(), "#초보환영".to_string());
        tags.insert("분위기".to_string(), "#가벼움".to_string());
        MatchResult {
            meeting: MeetingRecord {
                id: 7,
                category: Category::Sports,
                title: "운동 모임 8호".to_string(),
                tags,
            },
            score: 50,
            details: TagDimension::ALL
                .iter()
                .map(|d| DimensionMatch {
                    dimension: *d,
                    matched: matches!(d, TagDimension::Experience | TagDimension::Tone),
                })
                .collect(),
        }
    }

    #[test]
    fn test_clean_summary() {
        let mut report = CleanReport {
            total_records: 4,
            valid: 3,
            invalid: 1,
            ..Default::default()
        };
        report.rejections.insert("no korean", 1);

        let text = CleanSummary(&report).to_string();
        assert!(text.contains("유효 데이터: 3 (75.0%)"));
        assert!(text.contains("no korean: 1건"));
        assert!(!text.contains("중복 제거"));
    }

    #[test]
    fn test_distribution() {
        let counts = category_counts(vec![Category::Pets, Category::Pets, Category::Hobby, Category::Sports]);
        let text = Distribution(&counts).to_string();
        assert!(text.contains("50.0%"));
        assert!(text.contains("가족/육아"));
        assert!(text.contains("합계"));
    }

    #[test]
    fn test_match_list() {
        let results = [sample_result()];
        let text = MatchList(&results).to_string();
        assert!(text.contains("1. [50%] 운동 모임 8호 (운동)"));
        assert!(text.contains("태그: #초보환영 #가벼움"));
        assert!(text.contains("숙련도(O)"));
        assert!(text.contains("지속성(X)"));

        assert!(MatchList(&[]).to_string().contains("추천할 모임이 없습니다"));
    }

    #[test]
    fn test_matches_to_json() {
        let json = matches_to_json(&[sample_result()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["rank"], 1);
        assert_eq!(value[0]["id"], 7);
        assert_eq!(value[0]["score"], 50);
        assert_eq!(value[0]["category"], "운동");
        assert_eq!(value[0]["details"][3], "연령대(X)");
    }
}
