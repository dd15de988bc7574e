//! Portable `lipo -create`: combines thin Mach-O images into a 32-bit fat
//! (universal) binary.
//!
//! Assembly runs in a single pass: inspect every input, plan the layout,
//! encode the header, write the file. Nothing is written until every input
//! has been read and validated and the layout is known to fit.

use std::path::Path;

use goblin::mach::constants::cputype::{CPU_TYPE_ARM64, CPU_TYPE_X86_64};

mod error;
pub mod header;
pub mod inspect;
pub mod layout;
pub mod report;
pub mod write;

pub use error::FatError;
pub use inspect::InputBinary;
pub use layout::{ALIGN, ALIGN_BITS, FatManifest, Layout};
pub use report::{Event, Reporter, TracingReporter};

/// Builds a macOS universal binary from an x86_64 and an arm64 image.
///
/// Returns the length of the written file.
pub fn make_universal(
    amd64: &Path,
    arm64: &Path,
    target: &Path,
    reporter: &dyn Reporter,
) -> Result<u64, FatError> {
    let inputs = [(amd64, CPU_TYPE_X86_64), (arm64, CPU_TYPE_ARM64)]
        .into_iter()
        .map(|(path, expected)| -> Result<InputBinary, FatError> {
            let input = inspect(path, reporter)?;
            if input.cpu_type() != expected {
                reporter.report(Event::UnexpectedArch {
                    path,
                    expected,
                    found: input.cpu_type(),
                });
            }
            Ok(input)
        })
        .collect::<Result<Vec<_>, FatError>>()?;

    build(inputs, target, reporter)
}

/// Combines any number of thin images, in order, into a fat binary.
pub fn assemble(
    sources: &[impl AsRef<Path>],
    target: &Path,
    reporter: &dyn Reporter,
) -> Result<u64, FatError> {
    let inputs = sources
        .iter()
        .map(|path| inspect(path.as_ref(), reporter))
        .collect::<Result<Vec<_>, FatError>>()?;

    build(inputs, target, reporter)
}

fn inspect(path: &Path, reporter: &dyn Reporter) -> Result<InputBinary, FatError> {
    let input = InputBinary::read(path)?;
    reporter.report(Event::Inspected {
        path,
        cpu_type: input.cpu_type(),
        cpu_subtype: input.cpu_subtype(),
        len: input.data().len(),
    });
    Ok(input)
}

fn build(
    inputs: Vec<InputBinary>,
    target: &Path,
    reporter: &dyn Reporter,
) -> Result<u64, FatError> {
    let manifest = FatManifest::plan(inputs)?;
    for (index, entry) in manifest.entries().iter().enumerate() {
        reporter.report(Event::Planned {
            index,
            offset: entry.slot.offset,
            size: entry.slot.size,
        });
    }

    let header = header::encode(&manifest)?;
    let len = write::write(target, &header, &manifest)?;
    reporter.report(Event::Written { path: target, len });

    Ok(len)
}
