//! エクスポートアーカイブの展開

use crate::error::{AnnolabError, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// 相対パスが展開先の外へ出ないか検証
///
/// Normal コンポーネントのみ許容する（zip-slip 対策）。
pub fn safe_relative_path(path: &str) -> Result<PathBuf> {
    let normalized = path.replace('\\', "/");
    let relative = Path::new(&normalized);

    let unsafe_component = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if unsafe_component || normalized.is_empty() {
        return Err(AnnolabError::InvalidArchive(format!("unsafe entry path: {}", path)));
    }

    Ok(relative.to_path_buf())
}

/// zip アーカイブを `dest` に展開し、展開したファイル数を返す
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    let mut extracted = 0usize;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        let target = dest.join(safe_relative_path(&name)?);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    tracing::debug!("Extracted {} files to {}", extracted, dest.display());
    Ok(extracted)
}
