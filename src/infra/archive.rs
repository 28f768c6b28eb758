use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, warn};
use rand::Rng;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// 归档文件名: file_transfer_<时间>_<8 位随机 hex>.tar.gz
pub fn archive_name(now: DateTime<Local>) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("file_transfer_{}_{:08x}.tar.gz", now.format("%Y%m%d_%H%M%S"), suffix)
}

/// 将文件/目录打包为 tar.gz，每个条目以其文件名存放在归档根目录
pub fn create_archive(paths: &[PathBuf], out_dir: &Path) -> Result<PathBuf> {
    let existing: Vec<&PathBuf> = paths
        .iter()
        .filter(|p| {
            let exists = p.exists();
            if !exists {
                warn!("Skipping missing path {:?}", p);
            }
            exists
        })
        .collect();
    if existing.is_empty() {
        bail!("None of the selected paths exist");
    }

    let archive_path = out_dir.join(archive_name(Local::now()));
    if let Err(e) = write_archive(&archive_path, &existing) {
        // 写了一半的归档不留在临时目录
        if archive_path.exists() {
            if let Err(rm_err) = fs::remove_file(&archive_path) {
                warn!("Could not remove partial archive {:?}: {}", archive_path, rm_err);
            }
        }
        return Err(e);
    }
    Ok(archive_path)
}

fn write_archive(archive_path: &Path, paths: &[&PathBuf]) -> Result<()> {
    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive {:?}", archive_path))?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for path in paths {
        let name = entry_name(path)?;
        if path.is_dir() {
            builder
                .append_dir_all(&name, path)
                .with_context(|| format!("Failed to add directory {:?}", path))?;
        } else {
            builder
                .append_path_with_name(path, &name)
                .with_context(|| format!("Failed to add file {:?}", path))?;
        }
        debug!("Added {:?} as {:?}", path, name);
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("Failed to finish archive {:?}", archive_path))?;
    Ok(())
}

fn entry_name(path: &Path) -> Result<PathBuf> {
    // "." 或 "dir/.." 这类路径先规范化再取文件名
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    resolved
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("Cannot determine a name for {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::read::GzDecoder;
    use tempfile::tempdir;

    fn entries(archive: &Path) -> Vec<String> {
        let mut ar = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
        let mut names: Vec<String> = ar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_archive_name_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = archive_name(now);
        assert!(name.starts_with("file_transfer_20240309_140507_"));
        assert!(name.ends_with(".tar.gz"));
        assert_eq!(name.len(), "file_transfer_20240309_140507_".len() + 8 + ".tar.gz".len());
    }

    #[test]
    fn test_files_and_dirs_are_stored_by_basename() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();

        let file = src.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();
        let dir = src.path().join("site");
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("index.html"), "<html/>").unwrap();
        fs::write(dir.join("css/app.css"), "body{}").unwrap();

        let archive = create_archive(&[file, dir], out.path()).unwrap();
        assert!(archive.starts_with(out.path()));
        assert_eq!(
            entries(&archive),
            vec!["notes.txt", "site", "site/css", "site/css/app.css", "site/index.html"]
        );
    }

    #[test]
    fn test_missing_paths_are_skipped() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let file = src.path().join("a.bin");
        fs::write(&file, [0u8; 16]).unwrap();

        let archive = create_archive(&[src.path().join("ghost"), file], out.path()).unwrap();
        assert_eq!(entries(&archive), vec!["a.bin"]);
    }

    #[test]
    fn test_nothing_to_archive() {
        let out = tempdir().unwrap();
        let err = create_archive(&[out.path().join("ghost")], out.path()).unwrap_err();
        assert!(err.to_string().contains("None of the selected paths exist"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_archive_is_removed() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let dir = src.path().join("site");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.html"), "<html/>").unwrap();
        std::os::unix::fs::symlink(src.path().join("gone"), dir.join("dangling")).unwrap();

        let err = create_archive(&[dir], out.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to add directory"));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
