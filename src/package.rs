use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::archive::ArchiveKind;

/// Turns the assembled fat binary into the file that gets uploaded.
///
/// Compressed releases get an archive in the format the universal name
/// implies, holding the binary as `entry_name`. Otherwise the binary itself
/// is moved to `universal_name`.
pub fn package(
    fat_binary: &Path,
    entry_name: &str,
    universal_name: &str,
    compressed: bool,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let output = out_dir.join(universal_name);

    if compressed {
        let kind = ArchiveKind::from_name(universal_name)
            .with_context(|| format!("Unsupported archive format: {universal_name:?}"))?;
        kind.pack(fat_binary, entry_name, &output)?;
    } else if fs::rename(fat_binary, &output).is_err() {
        // Most likely crossing file systems
        fs::copy(fat_binary, &output).with_context(|| {
            format!("Failed to move {} to {}", fat_binary.display(), output.display())
        })?;
        fs::remove_file(fat_binary)?;
    }

    Ok(output)
}
