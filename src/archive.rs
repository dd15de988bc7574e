//! Release archives: unpacking downloads and re-packing the universal binary.

use std::{
    fs::{self, File},
    io::{self, BufReader},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Gz,
}

impl ArchiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".gz") {
            Some(ArchiveKind::Gz)
        } else {
            None
        }
    }

    /// Unpacks `archive` into `dest`.
    pub fn unpack(self, archive: &Path, dest: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dest)?;
        let file = BufReader::new(File::open(archive)?);

        match self {
            ArchiveKind::TarGz => tar::Archive::new(GzDecoder::new(file)).unpack(dest)?,
            ArchiveKind::Tar => tar::Archive::new(file).unpack(dest)?,
            ArchiveKind::Gz => {
                let name = archive
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| name.strip_suffix(".gz"))
                    .filter(|name| !name.is_empty())
                    .context("Cannot derive file name from gzip archive")?;
                let path = dest.join(name);
                let mut output = File::create(&path)?;
                io::copy(&mut GzDecoder::new(file), &mut output)?;
                // gzip does not record a mode and the contents are an executable
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
            }
        }

        Ok(())
    }

    /// Packs the single file `binary` into `output`, stored as `entry_name`.
    pub fn pack(self, binary: &Path, entry_name: &str, output: &Path) -> anyhow::Result<()> {
        let file = File::create(output)
            .with_context(|| format!("Failed to create archive {}", output.display()))?;

        match self {
            ArchiveKind::TarGz => {
                let encoder = GzEncoder::new(file, Compression::default());
                let mut builder = tar::Builder::new(encoder);
                builder.append_path_with_name(binary, entry_name)?;
                builder.into_inner()?.finish()?;
            }
            ArchiveKind::Tar => {
                let mut builder = tar::Builder::new(file);
                builder.append_path_with_name(binary, entry_name)?;
                builder.into_inner()?;
            }
            ArchiveKind::Gz => {
                let mut encoder = GzEncoder::new(file, Compression::default());
                io::copy(&mut File::open(binary)?, &mut encoder)?;
                encoder.finish()?;
            }
        }

        Ok(())
    }
}

/// Finds the executable inside an unpacked archive.
///
/// `binary` is tried as a path relative to `dir` first, then as a file name
/// anywhere below `dir`. Without it, `dir` must hold exactly one file.
pub fn locate_binary(dir: &Path, binary: Option<&Path>) -> anyhow::Result<PathBuf> {
    let files = regular_files(dir)?;

    let Some(binary) = binary else {
        return match files.as_slice() {
            [file] => Ok(file.clone()),
            [] => anyhow::bail!("Archive is empty"),
            _ => anyhow::bail!(
                "Archive contains {} files, use --binary to pick one",
                files.len()
            ),
        };
    };

    // `is_file` follows links, so a symlinked binary is found too.
    let direct = sanitise_path(dir, binary).context("Malformed binary path")?;
    if direct.is_file() {
        return Ok(direct);
    }

    let name = binary.file_name().context("Binary path has no file name")?;
    files
        .into_iter()
        .find(|file| file.file_name() == Some(name))
        .with_context(|| format!("Could not find {} in archive", binary.display()))
}

fn regular_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn sanitise_path(base_dir: &Path, path: &Path) -> Option<PathBuf> {
    use std::path::Component;

    let mut sanitised = base_dir.to_owned();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::CurDir => continue,
            Component::ParentDir => return None,
            Component::Normal(part) => sanitised.push(part),
        }
    }

    if sanitised == base_dir {
        return None;
    }

    Some(sanitised)
}
