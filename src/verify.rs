//! Integrity verification of fetched bytes
//!
//! The strongest checksum an item carries is authoritative: sha256 is
//! preferred over md5, a strong mismatch fails even when a weaker digest
//! happens to agree, and weaker digests are checked as well. Items with
//! no checksum at all verify as a distinct `Unverified` outcome. Some
//! legacy documents omit checksums entirely, and callers must be able to
//! tell that apart from a verified success.

use std::io::Read;

use md5::Md5;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::VerifyError;
use crate::model::ChecksumKind;
use crate::resolve::ResolvedItem;

/// Buffer size for streaming byte sources through the hashers.
const READ_BUF_LEN: usize = 8192;

/// The outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Bytes matched; the named algorithm was the strongest checked.
    Verified(ChecksumKind),
    /// The item carries no checksum, so nothing was checked.
    Unverified,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }
}

/// Verify an in-memory byte buffer against a resolved item's checksums.
pub fn verify_bytes(item: &ResolvedItem, bytes: &[u8]) -> Result<Verification, VerifyError> {
    verify_reader(item, bytes)
}

/// Verify a streaming byte source against a resolved item's checksums.
/// Every digest the item declares is computed in one pass; the strongest
/// is compared first so its verdict wins.
pub fn verify_reader<R: Read>(
    item: &ResolvedItem,
    mut reader: R,
) -> Result<Verification, VerifyError> {
    let expected_sha256 = item.checksum(ChecksumKind::Sha256);
    let expected_md5 = item.checksum(ChecksumKind::Md5);

    if expected_sha256.is_none() && expected_md5.is_none() {
        debug!(
            item = %item.item_key,
            "item carries no checksum; skipping verification"
        );
        return Ok(Verification::Unverified);
    }

    let mut sha256 = expected_sha256.map(|_| Sha256::new());
    let mut md5 = expected_md5.map(|_| Md5::new());

    let mut buf = [0u8; READ_BUF_LEN];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if let Some(hasher) = sha256.as_mut() {
            hasher.update(&buf[..n]);
        }
        if let Some(hasher) = md5.as_mut() {
            hasher.update(&buf[..n]);
        }
    }

    let mut strongest = ChecksumKind::Md5;
    if let (Some(expected), Some(hasher)) = (expected_sha256, sha256) {
        strongest = ChecksumKind::Sha256;
        let actual = hex::encode(hasher.finalize());
        if actual != expected {
            return Err(VerifyError::ChecksumMismatch {
                algorithm: ChecksumKind::Sha256,
                expected: expected.to_string(),
                actual,
            });
        }
    }
    if let (Some(expected), Some(hasher)) = (expected_md5, md5) {
        let actual = hex::encode(hasher.finalize());
        if actual != expected {
            return Err(VerifyError::ChecksumMismatch {
                algorithm: ChecksumKind::Md5,
                expected: expected.to_string(),
                actual,
            });
        }
    }

    Ok(Verification::Verified(strongest))
}
