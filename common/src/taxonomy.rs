//! 분류 체계 (카테고리 5종 + 태그 차원 4종)
//!
//! 검증기와 매칭 엔진이 공유하는 고정 열거형. 순서가 의미를 가진다:
//! - `Category::ALL`: 통계/분포 출력 순서
//! - `TagDimension::ALL`: 점수 계산 및 상세 항목 순서

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 모임 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "가족/육아")]
    FamilyParenting,
    #[serde(rename = "반려동물")]
    Pets,
    #[serde(rename = "운동")]
    Sports,
    #[serde(rename = "자기계발")]
    SelfImprovement,
    #[serde(rename = "취미/오락")]
    Hobby,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::FamilyParenting,
        Category::Pets,
        Category::Sports,
        Category::SelfImprovement,
        Category::Hobby,
    ];

    /// 표시 라벨 (직렬화 값과 동일)
    pub fn label(&self) -> &'static str {
        match self {
            Category::FamilyParenting => "가족/육아",
            Category::Pets => "반려동물",
            Category::Sports => "운동",
            Category::SelfImprovement => "자기계발",
            Category::Hobby => "취미/오락",
        }
    }

    /// 라벨 문자열에서 카테고리를 찾는다. 정확히 일치하는 경우만 인정.
    pub fn from_label(label: &str) -> Option<Category> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s.trim()).ok_or_else(|| {
            let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
            format!("알 수 없는 카테고리: {} (허용: {})", s, labels.join(", "))
        })
    }
}

/// 태그 차원 (각각 정확히 2개의 값을 가짐)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TagDimension {
    #[serde(rename = "숙련도")]
    Experience,
    #[serde(rename = "지속성")]
    Cadence,
    #[serde(rename = "분위기")]
    Tone,
    #[serde(rename = "연령대")]
    AgeMix,
}

impl TagDimension {
    pub const ALL: [TagDimension; 4] = [
        TagDimension::Experience,
        TagDimension::Cadence,
        TagDimension::Tone,
        TagDimension::AgeMix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TagDimension::Experience => "숙련도",
            TagDimension::Cadence => "지속성",
            TagDimension::Tone => "분위기",
            TagDimension::AgeMix => "연령대",
        }
    }

    /// 허용 값 2개
    pub fn values(&self) -> [&'static str; 2] {
        match self {
            TagDimension::Experience => ["#초보환영", "#고인물"],
            TagDimension::Cadence => ["#정기모임", "#번개"],
            TagDimension::Tone => ["#가벼움", "#진지함"],
            TagDimension::AgeMix => ["#또래중심", "#전연령"],
        }
    }

    pub fn from_name(name: &str) -> Option<TagDimension> {
        Self::ALL.iter().copied().find(|d| d.name() == name)
    }

    pub fn allows(&self, value: &str) -> bool {
        self.values().contains(&value)
    }
}

impl fmt::Display for TagDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 카테고리별 건수. 등장하지 않은 카테고리도 0으로 포함한다.
pub fn category_counts(categories: impl IntoIterator<Item = Category>) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> = Category::ALL.iter().map(|c| (*c, 0)).collect();
    for category in categories {
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}
