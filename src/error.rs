//! Error types for the NTFS decoder.
//!
//! The source carries a single error tag per object (`Volume.Error`,
//! `File.Error`) with a stable enumeration order used by its test suite.
//! `NtfsError` keeps that same ordering — tests that assert on a specific
//! discriminant, or that two operations fail identically, still make sense —
//! but replaces the tag-on-an-otherwise-valid-struct pattern with
//! `Result<T, NtfsError>`, since there is no partially valid `Volume` or
//! `File` to expose once a constructor fails.

use thiserror::Error;

/// All failure modes a decode can raise.
///
/// Variant order matches the source's `ntfs_error` enum exactly: `Success`
/// has no variant here since Rust expresses it as `Ok(())`.
#[derive(Error, Debug)]
pub enum NtfsError {
    #[error("failed to allocate memory")]
    MemoryError,

    #[error("failed opening handle to volume: {0}")]
    VolumeOpen(#[source] std::io::Error),

    #[error("failed reading volume boot record")]
    VolumeReadBootRecord,

    #[error("unknown volume signature (expected 0x55AA)")]
    VolumeUnknownSignature,

    #[error("partition was not found")]
    VolumePartitionNotFound,

    #[error("volume fields failed validation: {0}")]
    VolumeFailedValidation(&'static str),

    #[error("failed to load volume information file ({index})")]
    VolumeFailedLoadInfoFile { index: u64 },

    #[error("unsupported NTFS version {major}.{minor}")]
    VolumeUnsupportedVersion { major: u8, minor: u8 },

    #[error("failed to load the up-case table")]
    VolumeFailedLoadCaseTable,

    #[error("failed reading MFT record {index}: {source}")]
    RecordFailedRead { index: u64, source: std::io::Error },

    /// Raised both for genuinely corrupt records and for records whose
    /// in-use flag (0x01) is clear — the source does not distinguish a free
    /// MFT slot from a malformed one, and this port preserves that
    /// ambiguity rather than guess at the intended split.
    #[error("MFT record {index} failed validation: {reason}")]
    RecordFailedValidation { index: u64, reason: &'static str },

    #[error("file {index} is missing required $STANDARD_INFORMATION or $FILE_NAME")]
    FileFailedInfoValidation { index: u64 },

    #[error("file {index} has no unnamed $DATA attribute")]
    FileReadDataAttrNotFound { index: u64 },

    #[error("failed reading file {index} content: {source}")]
    FileReadFailed { index: u64, source: std::io::Error },
}
