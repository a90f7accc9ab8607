//! Pure-Rust reader for Jubatus model files.
//!
//! Every model file saved by a Jubatus server starts with a fixed 48-byte
//! big-endian header followed by two length-prefixed segments:
//!
//! * **header decoding**: [`decode_header`] reads the fixed header from any
//!   [`std::io::Read`] and exposes it as a [`ModelHeader`].
//! * **batch inspection**: [`Inspector`] applies the decoder to a list of
//!   paths, fail-fast or best-effort, and yields [`ModelDescriptor`]s.
//!
//! The segment payloads are left alone unless a [`SegmentDecoder`] is
//! registered for their [`SegmentKind`].

pub mod inspect;
pub mod reader;
pub mod segment;
pub mod types;

pub use inspect::{BatchMode, BatchReport, FileFailure, InspectOptions, Inspector, MagicPolicy, inspect};
pub use reader::{decode_header, read_segment};
pub use segment::{SegmentDecoder, SegmentDecoders};
pub use types::{
    BinaryHeader, HEADER_SIZE, JUBATUS_MAGIC, ModelDescriptor, ModelError, ModelHeader, SegmentKind,
    SystemDataRecord, UserDataRecord,
};
