use std::{
    fs,
    path::{Path, PathBuf},
};

use goblin::mach::{
    constants::cputype::{self, CpuSubType, CpuType},
    header::{MH_MAGIC, MH_MAGIC_64},
};

use super::FatError;

/// Magic, CPU type and CPU subtype: three little-endian words.
pub const MIN_INPUT_LEN: usize = 12;

/// A thin Mach-O image waiting to be embedded in a fat binary.
#[derive(Debug)]
pub struct InputBinary {
    data: Vec<u8>,
    cpu_type: CpuType,
    cpu_subtype: CpuSubType,
}

impl InputBinary {
    pub fn read(path: &Path) -> Result<Self, FatError> {
        let data = fs::read(path).map_err(FatError::io(path))?;
        InputBinary::from_bytes(path, data)
    }

    /// `path` only names the input in errors.
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Self, FatError> {
        if data.len() < MIN_INPUT_LEN {
            return Err(FatError::TooSmallInput {
                len: data.len(),
                path: path.into(),
            });
        }

        // Every architecture a fat binary can hold today is little endian.
        let magic = read_le(&data, 0);
        if magic != MH_MAGIC && magic != MH_MAGIC_64 {
            return Err(FatError::NotMachO {
                path: path.into(),
                magic,
            });
        }

        Ok(InputBinary {
            cpu_type: read_le(&data, 4),
            cpu_subtype: read_le(&data, 8),
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn cpu_type(&self) -> CpuType {
        self.cpu_type
    }

    pub fn cpu_subtype(&self) -> CpuSubType {
        self.cpu_subtype
    }
}

fn read_le(data: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Human readable architecture, falling back to the raw CPU type.
pub fn arch_name(cpu_type: CpuType, cpu_subtype: CpuSubType) -> String {
    // The high byte of the subtype holds capability bits, not the subtype.
    let subtype = cpu_subtype & !cputype::CPU_SUBTYPE_MASK;
    match cputype::get_arch_name_from_types(cpu_type, subtype) {
        Some(name) => name.to_owned(),
        None => match cpu_type {
            cputype::CPU_TYPE_X86_64 => "x86_64".to_owned(),
            cputype::CPU_TYPE_ARM64 => "arm64".to_owned(),
            _ => format!("{cpu_type:#x}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(magic: u32, cpu_type: u32, cpu_subtype: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&magic.to_le_bytes());
        data.extend_from_slice(&cpu_type.to_le_bytes());
        data.extend_from_slice(&cpu_subtype.to_le_bytes());
        data.extend_from_slice(&[0xAA; 4]);
        data
    }

    #[test]
    fn test_reads_fields_little_endian() {
        let data = vec![
            0xCF, 0xFA, 0xED, 0xFE, 0x07, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00, 0x00,
        ];
        let input = InputBinary::from_bytes("a", data).unwrap();
        assert_eq!(input.cpu_type(), 0x0100_0007);
        assert_eq!(input.cpu_subtype(), 3);
        assert_eq!(input.data().len(), 12);
    }

    #[test]
    fn test_accepts_32_bit_magic() {
        let input = InputBinary::from_bytes("a", image(0xFEEDFACE, 7, 3)).unwrap();
        assert_eq!(input.cpu_type(), 7);
        assert_eq!(input.data().len(), 16);
    }

    #[test]
    fn test_rejects_short_input() {
        let err = InputBinary::from_bytes("short", vec![0xCF, 0xFA, 0xED, 0xFE, 0, 0, 0, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(err, FatError::TooSmallInput { len: 10, .. }));
    }

    #[test]
    fn test_rejects_non_macho() {
        let err = InputBinary::from_bytes("elf", b"\x7fELF\x02\x01\x01\0\0\0\0\0".to_vec())
            .unwrap_err();
        assert!(matches!(err, FatError::NotMachO { magic: 0x464C457F, .. }));
    }

    #[test]
    fn test_rejects_fat_input() {
        let mut data = 0xCAFEBABEu32.to_be_bytes().to_vec();
        data.extend_from_slice(&[0; 12]);
        let err = InputBinary::from_bytes("fat", data).unwrap_err();
        assert!(matches!(err, FatError::NotMachO { .. }));
    }

    #[test]
    fn test_rejects_big_endian_macho() {
        let mut data = 0xFEEDFACFu32.to_be_bytes().to_vec();
        data.extend_from_slice(&[0; 12]);
        let err = InputBinary::from_bytes("ppc", data).unwrap_err();
        assert!(matches!(err, FatError::NotMachO { magic: 0xCFFAEDFE, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = InputBinary::read(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, FatError::Io { .. }));
    }

    #[test]
    fn test_arch_name() {
        assert_eq!(arch_name(cputype::CPU_TYPE_X86_64, 3), "x86_64");
        assert_eq!(arch_name(cputype::CPU_TYPE_ARM64, 0), "arm64");
        assert_eq!(arch_name(0x1234, 0), "0x1234");
    }
}
