//! Archive type detection and font file selection.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ProvisionError, Result};

/// File extensions copied out of a font archive.
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    /// Any tarball; compression is detected by `tar` itself
    Tar,
}

impl ArchiveKind {
    /// Detect the archive kind from the last path segment of a URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();

        if name.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else if [".tar", ".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar.bz2"]
            .iter()
            .any(|suffix| name.ends_with(suffix))
        {
            Ok(ArchiveKind::Tar)
        } else {
            Err(ProvisionError::UnsupportedArchive(url.to_string()))
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::Tar => ".tar",
        }
    }

    /// Program and arguments that unpack `archive` into `into`.
    pub fn extract_command(&self, archive: &Path, into: &Path) -> (&'static str, Vec<String>) {
        let archive = archive.display().to_string();
        let into = into.display().to_string();
        match self {
            ArchiveKind::Zip => ("unzip", vec!["-o".into(), "-q".into(), archive, "-d".into(), into]),
            ArchiveKind::Tar => ("tar", vec!["-xf".into(), archive, "-C".into(), into]),
        }
    }
}

pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Recursively collect font files below `dir`. Symlinks are not followed.
pub fn find_font_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ProvisionError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_font_file(entry.path()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Copy recognized font files from an unpacked archive into `dest`, flattening directories.
///
/// Files are copied into a staging directory next to `dest`, which is renamed
/// into place once every copy succeeded. `dest` is never left half-filled.
pub fn install_fonts(unpacked: &Path, dest: &Path) -> Result<usize> {
    let fonts = find_font_files(unpacked)?;
    if fonts.is_empty() {
        return Ok(0);
    }

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
    let staging = tempfile::Builder::new()
        .prefix(".zshup-fonts")
        .tempdir_in(parent)
        .map_err(|e| ProvisionError::io(parent, e))?;

    for font in &fonts {
        if let Some(name) = font.file_name() {
            let target = staging.path().join(name);
            std::fs::copy(font, &target).map_err(|e| ProvisionError::io(&target, e))?;
        }
    }

    std::fs::rename(staging.path(), dest).map_err(|e| ProvisionError::io(dest, e))?;
    Ok(fonts.len())
}
