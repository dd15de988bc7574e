use std::{fs, os::unix::fs::PermissionsExt, path::Path, process::Command};

mod common;

use common::{CPU_TYPE_ARM64, CPU_TYPE_X86_64, assert_universal, thin};

fn combine(amd64: &Path, arm64: &Path, output: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_amalgam"));
    command
        .arg("combine")
        .arg("--amd64")
        .arg(amd64)
        .arg("--arm64")
        .arg(arm64)
        .arg("--output")
        .arg(output)
        .env("LOG_LEVEL", "debug");
    command
}

#[test]
fn test_combine() {
    let dir = tempfile::tempdir().unwrap();
    let a = thin(CPU_TYPE_X86_64, 3, 30_000);
    let b = thin(CPU_TYPE_ARM64, 0, 12_345);
    fs::write(dir.path().join("amd64"), &a).unwrap();
    fs::write(dir.path().join("arm64"), &b).unwrap();
    let output = dir.path().join("universal");

    let status = combine(&dir.path().join("amd64"), &dir.path().join("arm64"), &output)
        .status()
        .unwrap();
    assert!(status.success());

    assert_universal(&output, &a, &b);
    let metadata = fs::metadata(&output).unwrap();
    assert_eq!(metadata.len(), 32768 + 12_345);
    assert_eq!(metadata.permissions().mode() & 0o111, 0o111);
}

#[test]
fn test_combine_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("amd64"), thin(CPU_TYPE_X86_64, 3, 100)).unwrap();
    fs::write(dir.path().join("arm64"), thin(CPU_TYPE_ARM64, 0, 200)).unwrap();
    let output = dir.path().join("universal");

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let status = combine(&dir.path().join("amd64"), &dir.path().join("arm64"), &output)
            .status()
            .unwrap();
        assert!(status.success());
        outputs.push(fs::read(&output).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good");
    fs::write(&good, thin(CPU_TYPE_ARM64, 0, 16)).unwrap();
    let short = dir.path().join("short");
    fs::write(&short, &thin(CPU_TYPE_X86_64, 3, 12)[..10]).unwrap();
    let script = dir.path().join("script");
    fs::write(&script, b"#!/bin/sh\necho hi\n").unwrap();
    let missing = dir.path().join("missing");
    let output = dir.path().join("universal");

    for (amd64, expected) in [(&short, 3), (&script, 4), (&missing, 6)] {
        let status = combine(amd64, &good, &output).status().unwrap();
        assert_eq!(status.code(), Some(expected), "{}", amd64.display());
        assert!(!output.exists());
    }
}
