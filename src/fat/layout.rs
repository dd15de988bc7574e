use goblin::mach::fat::FatArch;

use super::{FatError, header, inspect::InputBinary};

/// log2 of the alignment of every embedded image.
///
/// x86_64 needs 2^12 and arm64 2^14; using the largest requirement for all
/// architectures keeps the planner architecture-agnostic.
pub const ALIGN_BITS: u32 = 14;
pub const ALIGN: u64 = 1 << ALIGN_BITS;

/// First offset or size that no longer fits in a 32-bit `fat_arch`.
const FAT32_LIMIT: u64 = 1 << 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: u64,
    pub size: u64,
}

/// Where each image lands in the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    slots: Vec<Slot>,
}

impl Layout {
    /// Places images of the given sizes one after another, each starting on
    /// an [`ALIGN`] boundary. The header region is reserved a full alignment
    /// unit so the first image always starts at [`ALIGN`].
    pub fn plan(sizes: &[u64]) -> Layout {
        let mut cursor = align_up(header::header_len(sizes.len()) as u64);
        let mut slots = Vec::with_capacity(sizes.len());
        for &size in sizes {
            slots.push(Slot {
                offset: cursor,
                size,
            });
            cursor = align_up(cursor + size);
        }

        Layout { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Length of the output file. No padding follows the last image.
    pub fn total_len(&self) -> u64 {
        self.slots
            .last()
            .map_or(0, |slot| slot.offset + slot.size)
    }

    /// The first slot whose offset or size does not fit a 32-bit
    /// `fat_arch`. Any such slot means the layout needs the 64-bit fat
    /// header.
    pub fn oversized(&self) -> Option<&Slot> {
        self.slots.iter().find(|slot| exceeds_fat32(slot))
    }
}

fn exceeds_fat32(slot: &Slot) -> bool {
    slot.offset >= FAT32_LIMIT || slot.size >= FAT32_LIMIT
}

impl Slot {
    fn unsupported(&self) -> FatError {
        FatError::UnsupportedSize {
            offset: self.offset,
            size: self.size,
        }
    }
}

fn align_up(value: u64) -> u64 {
    value.div_ceil(ALIGN) * ALIGN
}

/// An input and where it lands in the output.
#[derive(Debug)]
pub struct Entry {
    pub input: InputBinary,
    pub slot: Slot,
}

impl Entry {
    /// The `fat_arch` record describing this entry.
    pub fn arch(&self) -> Result<FatArch, FatError> {
        let offset = u32::try_from(self.slot.offset).map_err(|_| self.slot.unsupported())?;
        let size = u32::try_from(self.slot.size).map_err(|_| self.slot.unsupported())?;
        Ok(FatArch {
            cputype: self.input.cpu_type(),
            cpusubtype: self.input.cpu_subtype(),
            offset,
            size,
            align: ALIGN_BITS,
        })
    }
}

/// Ordered inputs with their final placement. Entry `n` becomes `fat_arch`
/// `n` in the header.
#[derive(Debug)]
pub struct FatManifest {
    entries: Vec<Entry>,
    layout: Layout,
}

impl FatManifest {
    /// Lays out `inputs`, refusing layouts that need the 64-bit header.
    pub fn plan(inputs: Vec<InputBinary>) -> Result<FatManifest, FatError> {
        if inputs.is_empty() {
            return Err(FatError::NoInputs);
        }

        let sizes = inputs
            .iter()
            .map(|input| input.data().len() as u64)
            .collect::<Vec<_>>();
        FatManifest::from_layout(inputs, Layout::plan(&sizes))
    }

    /// The 64-bit fat header exists, but binaries using it neither run nor
    /// list correctly with Apple's tools, so it is refused outright.
    fn from_layout(inputs: Vec<InputBinary>, layout: Layout) -> Result<FatManifest, FatError> {
        if let Some(slot) = layout.oversized() {
            return Err(slot.unsupported());
        }
        let entries = inputs
            .into_iter()
            .zip(layout.slots().iter().copied())
            .map(|(input, slot)| Entry { input, slot })
            .collect();

        Ok(FatManifest { entries, layout })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Length the written file must have.
    pub fn total_len(&self) -> u64 {
        self.layout.total_len()
    }
}
