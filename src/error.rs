use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoimError {
    #[error("설정 에러: {0}")]
    Config(String),

    #[error("파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),

    #[error("카탈로그 파일이 올바르지 않습니다: {0}")]
    InvalidCatalog(String),

    #[error("프로필을 해석할 수 없습니다: {0}")]
    InvalidProfile(String),

    #[error("JSON 해석 에러: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] moim_match_common::Error),
}

pub type Result<T> = std::result::Result<T, MoimError>;
