use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
};

use super::{FatError, layout::FatManifest};

/// The output is meant to be run directly.
const OUTPUT_MODE: u32 = 0o755;

/// Writes the header and every image at its planned offset, zero-filling the
/// gaps. Returns the length of the file.
///
/// A failure can leave a partial file behind; it is not cleaned up.
pub fn write(path: &Path, header: &[u8], manifest: &FatManifest) -> Result<u64, FatError> {
    let file = File::create(path).map_err(FatError::io(path))?;
    file.set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))
        .map_err(FatError::io(path))?;

    let mut writer = BufWriter::new(file);
    let len = write_contents(&mut writer, header, manifest).map_err(FatError::io(path))?;
    debug_assert_eq!(len, manifest.total_len());

    let file = writer
        .into_inner()
        .map_err(|err| FatError::io(path)(err.into_error()))?;
    file.sync_all().map_err(FatError::io(path))?;

    Ok(len)
}

fn write_contents(
    writer: &mut impl Write,
    header: &[u8],
    manifest: &FatManifest,
) -> io::Result<u64> {
    writer.write_all(header)?;
    let mut offset = header.len() as u64;

    for entry in manifest.entries() {
        let start = entry.slot.offset;
        if offset < start {
            io::copy(&mut io::repeat(0).take(start - offset), writer)?;
            offset = start;
        }
        writer.write_all(entry.input.data())?;
        offset += entry.slot.size;
    }

    Ok(offset)
}
