use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure of a single assembly attempt. None of these are retried.
#[derive(Debug, Error)]
pub enum FatError {
    #[error("input {path:?} is too small to be a Mach-O image ({len} bytes)")]
    TooSmallInput { path: PathBuf, len: usize },

    #[error("input {path:?} is not a thin Mach-O image (magic={magic:#x})")]
    NotMachO { path: PathBuf, magic: u32 },

    #[error(
        "inputs too large to fit into a 32-bit fat binary (offset={offset:#x}, size={size:#x}); \
         the 64-bit fat header is not supported"
    )]
    UnsupportedSize { offset: u64, size: u64 },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no input binaries given")]
    NoInputs,

    #[error("failed to encode fat header: {0}")]
    Scroll(#[from] scroll::Error),
}

impl FatError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> FatError {
        let path = path.into();
        move |source| FatError::Io { path, source }
    }

    /// Process exit status a CLI should use for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            FatError::TooSmallInput { .. } => 3,
            FatError::NotMachO { .. } => 4,
            FatError::UnsupportedSize { .. } => 5,
            FatError::Io { .. } => 6,
            FatError::NoInputs => 7,
            FatError::Scroll(_) => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn all_kinds() -> Vec<FatError> {
        vec![
            FatError::TooSmallInput {
                path: "a".into(),
                len: 10,
            },
            FatError::NotMachO {
                path: "a".into(),
                magic: 0x464C457F,
            },
            FatError::UnsupportedSize {
                offset: 1 << 32,
                size: 16,
            },
            FatError::io("a")(io::Error::from(io::ErrorKind::NotFound)),
            FatError::NoInputs,
            FatError::Scroll(scroll::Error::TooBig { size: 20, len: 4 }),
        ]
    }

    #[test]
    fn test_exit_codes() {
        let codes = all_kinds()
            .iter()
            .map(FatError::exit_code)
            .collect::<Vec<_>>();
        assert_eq!(codes, [3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_exit_codes_are_distinct_failures() {
        let codes = all_kinds()
            .iter()
            .map(FatError::exit_code)
            .collect::<BTreeSet<_>>();
        assert_eq!(codes.len(), 6);
        // 0 is success, 1 generic failure and 2 a missing token.
        assert!(codes.iter().all(|&code| code > 2));
    }
}
