//! JSON Lines 입출력
//!
//! 알고리즘 바깥의 얇은 파일 경계. 입력 파일이 없으면 `FileNotFound`로 전체 실패.

use crate::error::{MoimError, Result};
use moim_match_common::{parse_profile_response, Catalog, MeetingRecord, TrainingRecord, UserProfile};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// stdin을 뜻하는 경로
pub const STDIN_PATH: &str = "-";

/// 입력 파일을 버퍼 리더로 연다
pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(MoimError::FileNotFound(path.display().to_string()));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// 파일을 `\n` 기준 바이트 줄로 나눈다 (병렬 정제용)
pub fn read_raw_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    if !path.exists() {
        return Err(MoimError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read(path)?;
    Ok(content.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect())
}

/// 정제된 코퍼스를 읽는다. 해석할 수 없는 줄은 경고 후 건너뛴다.
pub fn read_training_records(path: &Path) -> Result<Vec<TrainingRecord>> {
    let reader = open_input(path)?;
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TrainingRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(line = index + 1, error = %e, "레코드를 건너뜁니다"),
        }
    }

    Ok(records)
}

/// JSON Lines로 저장. 저장한 건수를 돌려준다.
pub fn write_training_records<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a TrainingRecord>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for record in records {
        writeln!(writer, "{}", record.to_json_line()?)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// 카탈로그 로드. JSON 배열 또는 JSON Lines 모두 허용.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let mut content = String::new();
    open_input(path)?.read_to_string(&mut content)?;

    let meetings: Vec<MeetingRecord> = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content)
            .map_err(|e| MoimError::InvalidCatalog(format!("{}: {}", path.display(), e)))?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    MoimError::InvalidCatalog(format!("{}:{}: {}", path.display(), index + 1, e))
                })
            })
            .collect::<Result<_>>()?
    };

    Ok(Catalog::new(meetings)?)
}

/// 카탈로그를 JSON 배열로 저장
pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, catalog.meetings())?;
    Ok(())
}

/// 분류기 응답 텍스트를 읽어 프로필로 변환. `-`는 stdin.
pub fn read_profile(path: &Path) -> Result<UserProfile> {
    let mut text = String::new();
    if path.as_os_str() == STDIN_PATH {
        std::io::stdin().lock().read_to_string(&mut text)?;
    } else {
        open_input(path)?.read_to_string(&mut text)?;
    }

    parse_profile_response(&text).map_err(|e| MoimError::InvalidProfile(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use moim_match_common::{validate_record, Category};
    use tempfile::tempdir;

    const LINE: &str = r#"{"instruction":"i","input":"x","output":"{\"category\":\"운동\",\"tags\":[],\"reasoning\":\"충분히 긴 한국어 추천 사유\"}"}"#;

    #[test]
    fn test_open_input_missing() {
        let err = open_input(Path::new("/nonexistent/path/12345.jsonl")).unwrap_err();
        assert!(matches!(err, MoimError::FileNotFound(_)));
    }

    #[test]
    fn test_write_and_read_training_records() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("out").join("clean.jsonl");
        let record = validate_record(LINE).unwrap();

        let written = write_training_records(&path, [&record, &record]).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n{}\n", LINE, LINE));

        let loaded = read_training_records(&path).unwrap();
        assert_eq!(loaded, vec![record.clone(), record]);
    }

    #[test]
    fn test_read_training_records_skips_bad_lines() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("mixed.jsonl");
        std::fs::write(&path, format!("{}\n깨진 줄\n\n{}\n", LINE, LINE)).unwrap();
        assert_eq!(read_training_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_raw_lines() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("raw.jsonl");
        std::fs::write(&path, "a\nb\n").unwrap();
        let lines = read_raw_lines(&path).unwrap();
        assert_eq!(lines, vec![b"a".to_vec(), b"b".to_vec(), Vec::new()]);
    }

    #[test]
    fn test_load_catalog_array_and_jsonl() {
        let dir = tempdir().expect("Failed to create temp dir");

        let array = dir.path().join("catalog.json");
        std::fs::write(
            &array,
            r##"[{"id": 1, "category": "운동", "title": "배드민턴", "tags": {"숙련도": "#초보환영"}}]"##,
        )
        .unwrap();
        let catalog = load_catalog(&array).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.meetings()[0].category, Category::Sports);

        let jsonl = dir.path().join("catalog.jsonl");
        std::fs::write(
            &jsonl,
            "{\"id\": 1, \"category\": \"운동\", \"title\": \"a\"}\n\n{\"id\": 2, \"category\": \"반려동물\", \"title\": \"b\"}\n",
        )
        .unwrap();
        assert_eq!(load_catalog(&jsonl).unwrap().len(), 2);
    }

    #[test]
    fn test_load_catalog_errors() {
        let dir = tempdir().expect("Failed to create temp dir");

        let bad_category = dir.path().join("bad.json");
        std::fs::write(&bad_category, r#"[{"id": 1, "category": "요리", "title": "a"}]"#).unwrap();
        assert!(matches!(load_catalog(&bad_category), Err(MoimError::InvalidCatalog(_))));

        let duplicate = dir.path().join("dup.json");
        std::fs::write(
            &duplicate,
            r#"[{"id": 1, "category": "운동", "title": "a"}, {"id": 1, "category": "운동", "title": "b"}]"#,
        )
        .unwrap();
        assert!(matches!(load_catalog(&duplicate), Err(MoimError::Common(_))));
    }

    #[test]
    fn test_read_profile_from_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("profile.txt");
        std::fs::write(&path, "```json\n{\"category\": \"자기계발\", \"tags\": {}}\n```").unwrap();
        let profile = read_profile(&path).unwrap();
        assert_eq!(profile.category(), Some(Category::SelfImprovement));

        std::fs::write(&path, "해석 불가").unwrap();
        assert!(matches!(read_profile(&path), Err(MoimError::InvalidProfile(_))));
    }
}
