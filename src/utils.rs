use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// 标准化路径，处理相对路径
pub fn normalize_path(path_str: &str) -> Result<PathBuf> {
    let path = PathBuf::from(path_str);

    if let Ok(p) = std::fs::canonicalize(&path) {
        return Ok(p);
    }

    // 如果文件不存在，手动拼接
    if path.is_absolute() {
        Ok(path)
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .with_context(|| "Could not determine the current directory")
    }
}

/// 1536 -> "1.5 KB"
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, SIZE_UNITS[unit])
}

/// 文件大小，目录则递归累加其中所有文件
pub fn path_size(path: &Path) -> u64 {
    if path.is_file() {
        return path.metadata().map(|m| m.len()).unwrap_or(0);
    }
    if !path.is_dir() {
        return 0;
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// "3 files selected • 12.0 MB"
pub fn selection_summary(paths: &[PathBuf]) -> String {
    let total: u64 = paths.iter().map(|p| path_size(p)).sum();
    match paths.len() {
        0 => "No files selected".to_string(),
        1 => format!("1 file selected • {}", format_size(total)),
        n => format!("{} files selected • {}", n, format_size(total)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024u64.pow(5)), "3072.0 TB");
    }

    #[test]
    fn test_path_size_recurses() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), [0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b"), [0u8; 24]).unwrap();

        assert_eq!(path_size(&dir.path().join("a")), 100);
        assert_eq!(path_size(dir.path()), 124);
        assert_eq!(path_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_selection_summary() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, [0u8; 2048]).unwrap();

        assert_eq!(selection_summary(&[]), "No files selected");
        assert_eq!(selection_summary(&[a.clone()]), "1 file selected • 2.0 KB");
        assert_eq!(selection_summary(&[a.clone(), a]), "2 files selected • 4.0 KB");
    }

    #[test]
    fn test_normalize_relative_path() {
        let p = normalize_path("surely-not-existing.txt").unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("surely-not-existing.txt"));
    }
}
