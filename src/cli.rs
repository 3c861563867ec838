use clap::{Parser, Subcommand};
use moim_match_common::{Category, RecordKey};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "moim-match")]
#[command(about = "학습 레코드 정제 및 소모임 매칭 도구", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 상세 로그를 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 생성기 출력 JSONL을 검증/복구하여 학습 데이터로 저장
    Clean {
        /// 원본 JSONL 파일
        #[arg(required = true)]
        input: PathBuf,

        /// 출력 파일 (기본: <입력>_cleaned.jsonl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// output 품질 검사(길이, 한국어) 생략
        #[arg(long)]
        skip_quality: bool,

        /// 동일 레코드 중복 제거 안 함
        #[arg(long)]
        no_dedup: bool,

        /// 줄 검증을 병렬로 수행
        #[arg(long)]
        parallel: bool,

        /// 자유 텍스트 최소 글자 수 (기본: 설정값)
        #[arg(long)]
        min_chars: Option<usize>,
    },

    /// 정제된 코퍼스의 카테고리 분포 출력
    Stats {
        #[arg(required = true)]
        input: PathBuf,
    },

    /// 카테고리로 레코드 필터링
    Filter {
        #[arg(required = true)]
        input: PathBuf,

        /// 남길 카테고리 (여러 번 지정 가능)
        #[arg(short, long = "category", required = true)]
        categories: Vec<Category>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// 필드 기준 중복 제거
    Dedup {
        #[arg(required = true)]
        input: PathBuf,

        /// 키 필드 (instruction/input/output)
        #[arg(short, long, default_value = "input")]
        key: RecordKey,

        /// 출력 파일 (생략 시 덮어쓰기)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 모임 카탈로그 생성
    Catalog {
        /// 모임 수 (기본: 설정값)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// 난수 시드 (기본: 환경 변수 또는 설정값)
        #[arg(long)]
        seed: Option<u64>,

        /// 저장할 JSON 파일
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 카테고리별 모임 수 출력
        #[arg(long)]
        stats: bool,
    },

    /// 분류기 응답(프로필)으로 모임 추천
    Match {
        /// 분류기 응답 파일 (`-`는 stdin)
        #[arg(required = true)]
        profile: PathBuf,

        /// 카탈로그 파일 (생략 시 시드로 생성)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// 추천 개수 (기본: 설정값)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// 카탈로그 생성 시드
        #[arg(long)]
        seed: Option<u64>,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 설정을 표시/편집
    Config {
        /// 설정을 표시
        #[arg(long)]
        show: bool,

        /// 기본 추천 개수 설정
        #[arg(long)]
        set_top_n: Option<usize>,

        /// 카탈로그 시드 설정
        #[arg(long)]
        set_seed: Option<u64>,
    },
}
