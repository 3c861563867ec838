use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use moim_match::{cli, config, io, report};
use moim_match_common::{
    category_distribution, clean_corpus_with_progress, clean_lines_parallel, filter_by_category,
    generate_catalog, remove_duplicates, Catalog, CleanOptions, CleanOutcome, MatchingEngine,
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use cli::{Cli, Commands};
use config::Config;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `data/raw.jsonl` → `data/raw_cleaned.jsonl`
fn default_clean_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_cleaned.jsonl", stem))
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar
}

fn build_catalog(config: &Config, count: Option<usize>, seed: Option<u64>) -> Catalog {
    let seed = seed.unwrap_or_else(|| config.effective_seed());
    let count = count.unwrap_or(config.catalog_size);
    tracing::debug!(count, seed, "카탈로그 생성");
    generate_catalog(count, &mut StdRng::seed_from_u64(seed))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load().context("설정 파일을 읽을 수 없습니다")?;

    match cli.command {
        Commands::Clean { input, output, skip_quality, no_dedup, parallel, min_chars } => {
            println!("🧹 moim-match - 학습 데이터 정제\n");

            let mut options = CleanOptions {
                validation: config.validation_options(!skip_quality),
                dedup: config.dedup && !no_dedup,
            };
            if let Some(min_chars) = min_chars {
                options.validation.min_text_chars = min_chars;
            }

            let CleanOutcome { records, report: clean_report } = if parallel {
                let lines = io::read_raw_lines(&input)?;
                println!("- {}줄 병렬 검증 중...", lines.len());
                clean_lines_parallel(&lines, &options)
            } else {
                let reader = io::open_input(&input)?;
                let bar = spinner();
                let outcome = clean_corpus_with_progress(reader, &options, |line| {
                    if line % 100 == 0 {
                        bar.set_message(format!("{}줄 처리", line));
                        bar.tick();
                    }
                });
                bar.finish_and_clear();
                outcome.with_context(|| format!("{} 읽기 실패", input.display()))?
            };

            let output = output.unwrap_or_else(|| default_clean_output(&input));
            let written = io::write_training_records(&output, &records)
                .with_context(|| format!("{} 저장 실패", output.display()))?;

            print!("{}", report::CleanSummary(&clean_report));
            println!("\n✔ {}건 저장: {}", written, output.display());
        }

        Commands::Stats { input } => {
            let records = io::read_training_records(&input)?;
            println!("📊 카테고리 분포 ({}건)\n", records.len());
            print!("{}", report::Distribution(&category_distribution(&records)));
        }

        Commands::Filter { input, categories, output } => {
            let records = io::read_training_records(&input)?;
            let filtered = filter_by_category(&records, &categories);
            let written = io::write_training_records(&output, filtered)?;
            println!("✔ {}건 중 {}건 저장: {}", records.len(), written, output.display());
        }

        Commands::Dedup { input, key, output } => {
            let records = io::read_training_records(&input)?;
            let before = records.len();
            let unique = remove_duplicates(records, key);
            let target = output.unwrap_or_else(|| input.clone());
            let written = io::write_training_records(&target, &unique)?;
            println!("✔ 중복 {}건 제거, {}건 저장: {}", before - written, written, target.display());
        }

        Commands::Catalog { count, seed, output, stats } => {
            let catalog = build_catalog(&config, count, seed);
            println!("✔ 모임 {}개 생성", catalog.len());

            if stats {
                let engine = MatchingEngine::new(catalog.clone());
                print!("{}", report::Distribution(&engine.category_statistics()));
            }

            if let Some(output) = output {
                io::save_catalog(&output, &catalog)
                    .with_context(|| format!("{} 저장 실패", output.display()))?;
                println!("✔ 카탈로그 저장: {}", output.display());
            }
        }

        Commands::Match { profile, catalog, top_n, seed, json } => {
            let profile = io::read_profile(&profile)?;
            let catalog = match catalog {
                Some(path) => io::load_catalog(&path)?,
                None => build_catalog(&config, None, seed),
            };
            let engine = MatchingEngine::new(catalog);
            let results = engine.match_profile(&profile, top_n.unwrap_or(config.default_top_n));

            if json {
                println!("{}", report::matches_to_json(&results)?);
            } else {
                println!("🔍 추천 모임 (카테고리: {})\n", profile.category);
                print!("{}", report::MatchList(&results));
            }
        }

        Commands::Config { show, set_top_n, set_seed } => {
            let mut config = config;
            let mut changed = false;

            if let Some(top_n) = set_top_n {
                config.default_top_n = top_n;
                changed = true;
            }
            if let Some(seed) = set_seed {
                config.catalog_seed = seed;
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 설정을 저장했습니다");
            }

            if show || !changed {
                println!("설정:");
                println!("  추천 개수: {}", config.default_top_n);
                println!("  카탈로그 크기: {}", config.catalog_size);
                println!("  카탈로그 시드: {} (적용값: {})", config.catalog_seed, config.effective_seed());
                println!("  최소 글자 수: {}", config.min_text_chars);
                println!("  중복 제거: {}", if config.dedup { "사용" } else { "사용 안 함" });
            }
        }
    }

    Ok(())
}
