//! Moim Match Common Library
//!
//! CLI와 외부 드라이버가 공유하는 핵심 로직:
//! - taxonomy: 카테고리 / 태그 차원
//! - parser, validator, corpus: 생성기 출력 복구와 학습 레코드 정제
//! - matching: 프로필 기반 모임 매칭 엔진

pub mod taxonomy;
pub mod types;
pub mod error;
pub mod parser;
pub mod validator;
pub mod corpus;
pub mod matching;

pub use taxonomy::{category_counts, Category, TagDimension};
pub use types::{
    DimensionMatch, HardNegative, HardNegativeOutput, LegacyOutput, MatchResult, MeetingRecord,
    RecordOutput, Schema, TagMap, TrainingRecord, UserProfile,
};
pub use error::{Error, Result};
pub use parser::{parse_json_object, parse_lenient, parse_profile_response, strip_markdown};
pub use validator::{normalize_text, validate_record, validate_record_with, RejectReason, ValidationOptions};
pub use corpus::{
    category_distribution, clean_corpus, clean_corpus_with_progress, filter_by_category,
    remove_duplicates, CleanOptions, CleanOutcome, CleanReport, RecordKey,
};
#[cfg(feature = "parallel")]
pub use corpus::clean_lines_parallel;
pub use matching::{generate_catalog, Catalog, MatchingEngine, DEFAULT_TOP_N};
