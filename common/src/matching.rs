//! 매칭 엔진
//!
//! 3단계 매칭:
//! 1. Hard Filter: 카테고리 정확 일치
//! 2. Soft Score: 태그 차원별 일치 시 25점 (최대 100점)
//! 3. Top-N: 점수 내림차순 안정 정렬 후 상위 N개
//!
//! 카탈로그는 불변 스냅샷(`Arc<[MeetingRecord]>`)이며, 갱신은 새 스냅샷으로 교체한다.

use crate::error::{Error, Result};
use crate::taxonomy::{category_counts, Category, TagDimension};
use crate::types::{DimensionMatch, MatchResult, MeetingRecord, TagMap, UserProfile};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// 차원 하나가 일치할 때의 점수
pub const POINTS_PER_TAG: u32 = 25;

/// 기본 추천 개수
pub const DEFAULT_TOP_N: usize = 3;

/// 불변 모임 카탈로그
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    meetings: Arc<[MeetingRecord]>,
}

impl Catalog {
    /// 주어진 순서를 그대로 유지한다. id 중복은 에러.
    pub fn new(meetings: Vec<MeetingRecord>) -> Result<Self> {
        let mut ids = HashSet::new();
        for meeting in &meetings {
            if !ids.insert(meeting.id) {
                return Err(Error::Catalog(format!("중복 id: {}", meeting.id)));
            }
        }
        Ok(Self {
            meetings: meetings.into(),
        })
    }

    pub fn meetings(&self) -> &[MeetingRecord] {
        &self.meetings
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }
}

/// 테스트/데모용 모임 카탈로그 생성
///
/// 재현성을 위해 호출자가 시드된 RNG를 넘긴다.
///
/// # Examples
/// ```
/// use moim_match_common::generate_catalog;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let catalog = generate_catalog(10, &mut StdRng::seed_from_u64(7));
/// assert_eq!(catalog.len(), 10);
/// assert_eq!(catalog.meetings()[0].id, 0);
/// ```
pub fn generate_catalog<R: Rng>(count: usize, rng: &mut R) -> Catalog {
    let meetings: Vec<MeetingRecord> = (0..count)
        .map(|i| {
            let category = Category::ALL[rng.random_range(0..Category::ALL.len())];
            let tags: TagMap = TagDimension::ALL
                .iter()
                .map(|dimension| {
                    let values = dimension.values();
                    let value = values[rng.random_range(0..values.len())];
                    (dimension.name().to_string(), value.to_string())
                })
                .collect();

            MeetingRecord {
                id: i as u64,
                category,
                title: format!("{} 모임 {}호", category, i + 1),
                tags,
            }
        })
        .collect();

    // id가 0..count로 유일하므로 실패하지 않는다
    Catalog {
        meetings: meetings.into(),
    }
}

/// 태그 차원별 비교. 어느 한쪽에 값이 없으면 불일치.
pub fn score_meeting(profile: &UserProfile, meeting: &MeetingRecord) -> (u32, Vec<DimensionMatch>) {
    let mut score = 0;
    let details: Vec<DimensionMatch> = TagDimension::ALL
        .iter()
        .map(|&dimension| {
            let matched = match (profile.tag(dimension), meeting.tag(dimension)) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => false,
            };
            if matched {
                score += POINTS_PER_TAG;
            }
            DimensionMatch { dimension, matched }
        })
        .collect();
    (score, details)
}

/// 매칭 엔진 (호출 간 상태 없음)
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    catalog: Catalog,
}

impl MatchingEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 새 카탈로그 스냅샷을 쓰는 엔진. 기존 엔진으로 진행 중인 조회는 이전 스냅샷을 본다.
    pub fn with_catalog(&self, catalog: Catalog) -> Self {
        Self::new(catalog)
    }

    /// 프로필에 맞는 모임 상위 `top_n`개
    ///
    /// 같은 카테고리의 모임만 후보로 삼고, 태그 차원마다 일치하면 25점을 더한다.
    /// 동점이면 카탈로그 순서를 유지한다.
    ///
    /// # Arguments
    /// * `profile` - 분류기 응답에서 얻은 프로필
    /// * `top_n` - 최대 결과 수 (0이면 빈 결과)
    ///
    /// # Returns
    /// 점수 내림차순 결과. 카테고리가 비었거나 알 수 없거나 후보가 없으면 빈 목록이며 에러를 내지 않는다.
    pub fn match_profile(&self, profile: &UserProfile, top_n: usize) -> Vec<MatchResult> {
        if top_n == 0 {
            return Vec::new();
        }

        let Some(category) = profile.category() else {
            tracing::debug!(category = %profile.category, "인식할 수 없는 카테고리");
            return Vec::new();
        };

        // 1단계: Hard Filter
        let filtered: Vec<&MeetingRecord> = self
            .catalog
            .meetings()
            .iter()
            .filter(|m| m.category == category)
            .collect();
        tracing::debug!(%category, candidates = filtered.len(), "Hard Filter");

        if filtered.is_empty() {
            return Vec::new();
        }

        // 2단계: Soft Score
        let mut candidates: Vec<MatchResult> = filtered
            .into_iter()
            .map(|meeting| {
                let (score, details) = score_meeting(profile, meeting);
                MatchResult {
                    meeting: meeting.clone(),
                    score,
                    details,
                }
            })
            .collect();

        // 3단계: Top-N. 동점은 카탈로그 순서 유지 (sort_by는 안정 정렬)
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates.truncate(top_n);
        candidates
    }

    pub fn meetings_in_category(&self, category: Category) -> Vec<&MeetingRecord> {
        self.catalog
            .meetings()
            .iter()
            .filter(|m| m.category == category)
            .collect()
    }

    /// 카테고리별 모임 수 (0건 포함)
    pub fn category_statistics(&self) -> BTreeMap<Category, usize> {
        category_counts(self.catalog.meetings().iter().map(|m| m.category))
    }
}
