use std::{
    fs::{self, File},
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    archive::{self, ArchiveKind},
    github::{Asset, GitHub},
    validate::{self, Validate},
};

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Release assets are archives to unpack.
    pub compressed: bool,
    /// The executable inside each archive.
    pub binary: Option<PathBuf>,
}

/// Downloads `asset` below `work_dir` and returns the path of the thin
/// executable it contains.
pub fn fetch(
    github: &GitHub,
    asset: &Asset,
    work_dir: &Path,
    options: &FetchOptions,
) -> anyhow::Result<PathBuf> {
    tracing::debug!(name = %asset.name, url = %asset.browser_download_url, "Downloading asset");

    let download_dir = work_dir.join(format!("download-{}", asset.id));
    fs::create_dir_all(&download_dir)?;
    let download = download_dir.join(file_name(&asset.name)?);
    download_to(github, asset, &download)
        .with_context(|| format!("Downloading {}", asset.name))?;

    if !options.compressed {
        return Ok(download);
    }

    let kind = ArchiveKind::from_name(&asset.name)
        .with_context(|| format!("Unsupported archive format: {:?}", asset.name))?;
    let extract_dir = work_dir.join(format!("extract-{}", asset.id));
    kind.unpack(&download, &extract_dir)
        .with_context(|| format!("Failed to unpack {}", asset.name))?;

    archive::locate_binary(&extract_dir, options.binary.as_deref())
        .with_context(|| format!("Locating binary in {}", asset.name))
}

fn download_to(github: &GitHub, asset: &Asset, path: &Path) -> anyhow::Result<()> {
    let mut response = github.send(github.client().get(&asset.browser_download_url))?;
    let mut file = File::create(path)?;

    let sha256 = match asset.digest.as_deref() {
        Some(digest) => {
            let sha256 = validate::parse_digest(digest)?;
            if sha256.is_none() {
                tracing::debug!(digest, "Skipping verification of unsupported digest");
            }
            sha256
        }
        None => None,
    };

    match sha256 {
        Some(sha256) => {
            let mut reader = Validate::new(response, sha256);
            io::copy(&mut reader, &mut file)?;
            reader.validate()?;
            tracing::debug!(name = %asset.name, "Checksum verified");
        }
        None => {
            io::copy(&mut response, &mut file)?;
        }
    }

    // An uncompressed asset is the executable itself.
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;

    Ok(())
}

/// Asset names come from the server; only their final component is used.
fn file_name(name: &str) -> anyhow::Result<&str> {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid asset name: {name:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("tool_darwin_amd64").unwrap(), "tool_darwin_amd64");
        assert_eq!(file_name("../../etc/passwd").unwrap(), "passwd");
        assert!(file_name("..").is_err());
        assert!(file_name("").is_err());
    }
}
