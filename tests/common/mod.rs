use std::{fs, path::Path};

pub const CPU_TYPE_X86_64: u32 = 0x0100_0007;
pub const CPU_TYPE_ARM64: u32 = 0x0100_000C;

/// A fake 64-bit thin Mach-O image: real header fields, filler body.
pub fn thin(cpu_type: u32, cpu_subtype: u32, len: usize) -> Vec<u8> {
    let mut data = (0..len).map(|i| (i % 199) as u8 + 7).collect::<Vec<_>>();
    data[0..4].copy_from_slice(&0xFEEDFACFu32.to_le_bytes());
    data[4..8].copy_from_slice(&cpu_type.to_le_bytes());
    data[8..12].copy_from_slice(&cpu_subtype.to_le_bytes());
    data
}

pub fn read_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Checks `path` is a two-arch fat binary holding `amd64` then `arm64`.
pub fn assert_universal(path: &Path, amd64: &[u8], arm64: &[u8]) {
    let out = fs::read(path).unwrap();
    assert_eq!(read_be(&out, 0), 0xCAFEBABE);
    assert_eq!(read_be(&out, 4), 2);
    for (index, (input, cpu_type)) in [(amd64, CPU_TYPE_X86_64), (arm64, CPU_TYPE_ARM64)]
        .into_iter()
        .enumerate()
    {
        let arch = 8 + index * 20;
        assert_eq!(read_be(&out, arch), cpu_type);
        let offset = read_be(&out, arch + 8) as usize;
        let size = read_be(&out, arch + 12) as usize;
        assert_eq!(offset % 16384, 0);
        assert_eq!(read_be(&out, arch + 16), 14);
        assert_eq!(&out[offset..offset + size], input);
    }
}
