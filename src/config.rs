use crate::error::{MoimError, Result};
use moim_match_common::{ValidationOptions, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 카탈로그 시드를 덮어쓰는 환경 변수
pub const SEED_ENV: &str = "MOIM_MATCH_SEED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_top_n: usize,
    pub catalog_size: usize,
    pub catalog_seed: u64,
    pub min_text_chars: usize,
    pub dedup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_top_n: DEFAULT_TOP_N,
            catalog_size: 50,
            catalog_seed: 42,
            min_text_chars: ValidationOptions::default().min_text_chars,
            dedup: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MoimError::Config("홈 디렉터리를 찾을 수 없습니다".into()))?;
        Ok(home.join(".config").join("moim-match").join("config.json"))
    }

    /// 환경 변수를 우선한다
    pub fn effective_seed(&self) -> u64 {
        let Ok(raw) = std::env::var(SEED_ENV) else {
            return self.catalog_seed;
        };
        match raw.trim().parse() {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(
                    env = SEED_ENV,
                    value = %raw,
                    error = %e,
                    "시드 환경 변수를 해석할 수 없어 설정값을 사용합니다"
                );
                self.catalog_seed
            }
        }
    }

    pub fn validation_options(&self, check_quality: bool) -> ValidationOptions {
        ValidationOptions {
            check_quality,
            min_text_chars: self.min_text_chars,
        }
    }
}
