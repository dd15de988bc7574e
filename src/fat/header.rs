use goblin::mach::fat::{FAT_MAGIC, SIZEOF_FAT_ARCH, SIZEOF_FAT_HEADER};
use scroll::Pwrite;

use super::{FatError, layout::FatManifest};

pub fn header_len(arch_count: usize) -> usize {
    SIZEOF_FAT_HEADER + arch_count * SIZEOF_FAT_ARCH
}

/// Serialises `fat_header` followed by one `fat_arch` per entry.
///
/// The fat header is big endian no matter what the embedded images are.
pub fn encode(manifest: &FatManifest) -> Result<Vec<u8>, FatError> {
    let entries = manifest.entries();
    let mut header = vec![0u8; header_len(entries.len())];
    let mut offset = 0;

    header.gwrite_with(FAT_MAGIC, &mut offset, scroll::BE)?;
    header.gwrite_with(entries.len() as u32, &mut offset, scroll::BE)?;
    for entry in entries {
        header.gwrite_with(entry.arch()?, &mut offset, scroll::BE)?;
    }

    Ok(header)
}
