//! Jubatus model container types and constants.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Magic bytes written by Jubatus servers at offset 0.
pub const JUBATUS_MAGIC: [u8; 8] = *b"jubatus\0";

/// Size of the fixed binary header in bytes.
pub const HEADER_SIZE: usize = 48;

//  Binary header

/// The fixed header exactly as laid out on disk.
///
/// All multi-byte integers are big-endian. Field order is part of the wire
/// contract: `decode` and `encode` in [`crate::reader`] walk the fields in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub magic: [u8; 8],
    pub format_version: u64,
    pub major: u32,
    pub minor: u32,
    pub maintenance: u32,
    pub crc32: u32,
    pub system_data_size: u64,
    pub user_data_size: u64,
}

impl BinaryHeader {
    /// Producer version rendered as `major.minor.maintenance`.
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.maintenance)
    }
}

//  Segment kind

/// One of the two variable-length regions following the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Server-side metadata, stored right after the header.
    System,
    /// Algorithm state, stored after the system segment.
    User,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system-data"),
            Self::User => f.write_str("user-data"),
        }
    }
}

//  Decoded header

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHeader {
    /// The 8 magic bytes, NULs included.
    #[serde(rename = "Magic")]
    pub magic: String,
    pub format_version: u64,
    pub jubatus_version: String,
    pub crc32: u32,
    pub system_data_size: u64,
    pub user_data_size: u64,
    /// Header bytes exactly as read, kept for checksum verification.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl ModelHeader {
    pub fn from_binary(binary: &BinaryHeader, raw: Vec<u8>) -> Self {
        Self {
            magic: String::from_utf8_lossy(&binary.magic).into_owned(),
            format_version: binary.format_version,
            jubatus_version: binary.version_string(),
            crc32: binary.crc32,
            system_data_size: binary.system_data_size,
            user_data_size: binary.user_data_size,
            raw,
        }
    }

    /// Compare the raw magic bytes, not the lossy string.
    pub fn has_magic(&self, expected: &[u8; 8]) -> bool {
        self.raw.get(..expected.len()) == Some(&expected[..])
    }

    /// Byte range of a segment within the container, `None` on overflow.
    pub fn segment_range(&self, kind: SegmentKind) -> Option<Range<u64>> {
        let system_start = HEADER_SIZE as u64;
        let user_start = system_start.checked_add(self.system_data_size)?;
        match kind {
            SegmentKind::System => Some(system_start..user_start),
            SegmentKind::User => Some(user_start..user_start.checked_add(self.user_data_size)?),
        }
    }

    /// Total container length implied by the header.
    pub fn declared_len(&self) -> Option<u64> {
        self.segment_range(SegmentKind::User).map(|r| r.end)
    }
}

//  Segment records

/// Server metadata stored in the system-data segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDataRecord {
    pub version: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl SystemDataRecord {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataRecord {
    pub version: u64,
}

//  Descriptor

/// Caller-facing summary of one inspected file.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    path: PathBuf,
    header: ModelHeader,
    #[serde(skip)]
    system_data: BTreeMap<String, SystemDataRecord>,
    #[serde(skip)]
    user_data: BTreeMap<String, UserDataRecord>,
}

impl ModelDescriptor {
    pub(crate) fn new(
        path: PathBuf,
        header: ModelHeader,
        system_data: BTreeMap<String, SystemDataRecord>,
        user_data: BTreeMap<String, UserDataRecord>,
    ) -> Self {
        Self {
            path,
            header,
            system_data,
            user_data,
        }
    }

    /// Absolute path of the inspected file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Empty unless a system-data decoder was registered.
    pub fn system_data(&self) -> &BTreeMap<String, SystemDataRecord> {
        &self.system_data
    }

    /// Empty unless a user-data decoder was registered.
    pub fn user_data(&self) -> &BTreeMap<String, UserDataRecord> {
        &self.user_data
    }
}

//  Error

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Cannot open '{}': {source}", .path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Truncated header: read {read} of {expected} bytes (file too small)")]
    TruncatedHeader { read: usize, expected: usize },

    #[error("Cannot decode header: {0}")]
    DecodeFailed(String),

    #[error("Cannot resolve absolute path of '{}': {source}", .path.display())]
    PathResolutionFailed { path: PathBuf, source: io::Error },

    #[error("Unrecognized format: magic {magic:?} does not identify a Jubatus model")]
    UnrecognizedFormat { magic: String },

    #[error("Truncated {kind} segment: read {read} of {expected} bytes")]
    TruncatedSegment {
        kind: SegmentKind,
        expected: u64,
        read: u64,
    },

    #[error("Cannot decode {kind} segment: {reason}")]
    SegmentDecodeFailed { kind: SegmentKind, reason: String },

    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        source: Box<ModelError>,
    },
}

impl ModelError {
    /// Path named by this error, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::OpenFailed { path, .. }
            | Self::PathResolutionFailed { path, .. }
            | Self::InFile { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The underlying error with any file context peeled off.
    pub fn root(&self) -> &ModelError {
        match self {
            Self::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attach `path` unless the error already names one.
    pub(crate) fn in_file(self, path: &Path) -> Self {
        if self.path().is_some() {
            return self;
        }
        Self::InFile {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}
