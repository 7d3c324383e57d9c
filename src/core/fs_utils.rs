//! File system utility helpers (encoding-aware readers, source discovery)
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Reads a BSL file with encoding detection and BOM handling.
/// UTF-16 is recognised by BOM, UTF-8 is tried next, Windows-1251 is the fallback
/// (common in older Russian 1C installations).
pub fn read_bsl_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_bsl_bytes(&bytes))
}

/// Decode raw file bytes into UTF-8 text without BOM.
pub fn decode_bsl_bytes(bytes: &[u8]) -> String {
    let content = match bytes {
        [0xFF, 0xFE, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16LE file");
            }
            decoded.into_owned()
        }
        [0xFE, 0xFF, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16BE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16BE file");
            }
            decoded.into_owned()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                tracing::debug!("UTF-8 decoding failed, trying Windows-1251");
                let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(bytes);
                if had_errors {
                    tracing::warn!("Errors detected while decoding Windows-1251 file");
                }
                decoded.into_owned()
            }
        },
    };
    strip_bom(&content).to_string()
}

/// Removes a UTF-8 BOM (U+FEFF) from the beginning of text if present.
pub fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{FEFF}').unwrap_or(input)
}

/// Рекурсивный поиск исходников с заданными расширениями (без учёта регистра).
/// Результат отсортирован, чтобы порядок отчёта не зависел от файловой системы.
pub fn collect_source_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{FEFF}Процедура Тест()"), "Процедура Тест()");
        assert_eq!(strip_bom("Процедура Тест()"), "Процедура Тест()");
        assert_eq!(strip_bom(""), "");
    }

    #[test]
    fn decodes_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "А = 1;".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_bsl_bytes(&bytes), "А = 1;");
    }

    #[test]
    fn falls_back_to_windows_1251() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode("Перем А;");
        assert_eq!(decode_bsl_bytes(&encoded), "Перем А;");
    }

    #[test]
    fn collects_sources_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.bsl"), "").unwrap();
        std::fs::write(dir.path().join("nested").join("a.OS"), "").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();

        let files = collect_source_files(dir.path(), &["bsl".into(), "os".into()]);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with("c.txt")));
    }
}
