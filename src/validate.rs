use std::io;

use data_encoding::HEXLOWER_PERMISSIVE;
use ring::digest::{self, SHA256, SHA256_OUTPUT_LEN};

/// Hashes everything read through it so the stream can be checked against a
/// published SHA-256 once fully consumed.
pub struct Validate<R> {
    inner: R,
    digest_context: digest::Context,
    sha256: Vec<u8>,
}

impl<R: io::Read> Validate<R> {
    pub fn new(inner: R, sha256: Vec<u8>) -> Self {
        Validate {
            inner,
            digest_context: digest::Context::new(&SHA256),
            sha256,
        }
    }

    pub fn validate(self) -> anyhow::Result<()> {
        let checksum = self.digest_context.finish();
        anyhow::ensure!(
            checksum.as_ref() == self.sha256.as_slice(),
            "Checksum mismatch",
        );
        Ok(())
    }
}

/// Extracts the checksum from a GitHub asset digest such as `sha256:9f86d0...`.
///
/// Returns `Ok(None)` for digests using another algorithm.
pub fn parse_digest(digest: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let Some(hex) = digest.strip_prefix("sha256:") else {
        return Ok(None);
    };
    let sha256 = HEXLOWER_PERMISSIVE.decode(hex.as_bytes())?;
    anyhow::ensure!(
        sha256.len() == SHA256_OUTPUT_LEN,
        "Malformed sha256 digest: {digest:?}",
    );
    Ok(Some(sha256))
}

impl<R: io::Read> io::Read for Validate<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.digest_context.update(&buf[..len]);
        Ok(len)
    }
}
