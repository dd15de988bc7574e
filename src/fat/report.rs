//! Diagnostic events emitted while assembling a fat binary.
//!
//! The assembler never logs on its own; callers hand it a [`Reporter`] and
//! decide where the events go.

use std::path::Path;

use super::inspect::arch_name;

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// An input was read and recognised as a thin Mach-O image.
    Inspected {
        path: &'a Path,
        cpu_type: u32,
        cpu_subtype: u32,
        len: usize,
    },
    /// An input does not carry the CPU type its slot expects.
    UnexpectedArch {
        path: &'a Path,
        expected: u32,
        found: u32,
    },
    /// An input was given its place in the output file.
    Planned {
        index: usize,
        offset: u64,
        size: u64,
    },
    /// The output file is complete.
    Written { path: &'a Path, len: u64 },
}

pub trait Reporter {
    fn report(&self, event: Event<'_>);
}

impl Reporter for () {
    fn report(&self, _event: Event<'_>) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::Inspected {
                path,
                cpu_type,
                cpu_subtype,
                len,
            } => tracing::debug!(
                path = %path.display(),
                arch = %arch_name(cpu_type, cpu_subtype),
                len,
                "inspected input",
            ),
            Event::UnexpectedArch {
                path,
                expected,
                found,
            } => tracing::warn!(
                path = %path.display(),
                expected = %arch_name(expected, 0),
                found = %arch_name(found, 0),
                "input architecture does not match its slot",
            ),
            Event::Planned {
                index,
                offset,
                size,
            } => tracing::debug!(index, offset, size, "planned fat arch"),
            Event::Written { path, len } => {
                tracing::info!(path = %path.display(), len, "wrote fat binary")
            }
        }
    }
}
