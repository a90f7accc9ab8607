//! Pluggable decoders for the system-data and user-data segments.
//!
//! The payload encoding of both segments is owned by the Jubatus server
//! version that wrote the file, so this crate only locates the bytes and hands
//! them to whatever decoder the caller registers for that [`SegmentKind`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Seek};

use tracing::debug;

use crate::reader::read_segment;
use crate::types::*;

/// Decodes one segment payload into named records.
pub trait SegmentDecoder<R>: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<BTreeMap<String, R>, ModelError>;
}

impl<R, F> SegmentDecoder<R> for F
where
    F: Fn(&[u8]) -> Result<BTreeMap<String, R>, ModelError> + Send + Sync,
{
    fn decode(&self, payload: &[u8]) -> Result<BTreeMap<String, R>, ModelError> {
        self(payload)
    }
}

type SystemDecoder = Box<dyn SegmentDecoder<SystemDataRecord>>;
type UserDecoder = Box<dyn SegmentDecoder<UserDataRecord>>;

/// Decoded contents of both segments; a map is empty when its kind had no
/// decoder.
pub(crate) type SegmentRecords = (
    BTreeMap<String, SystemDataRecord>,
    BTreeMap<String, UserDataRecord>,
);

/// At most one decoder per segment kind.
#[derive(Default)]
pub struct SegmentDecoders {
    system: Option<SystemDecoder>,
    user: Option<UserDecoder>,
}

impl SegmentDecoders {
    pub fn set_system(&mut self, decoder: impl SegmentDecoder<SystemDataRecord> + 'static) {
        self.system = Some(Box::new(decoder));
    }

    pub fn set_user(&mut self, decoder: impl SegmentDecoder<UserDataRecord> + 'static) {
        self.user = Some(Box::new(decoder));
    }

    pub fn is_registered(&self, kind: SegmentKind) -> bool {
        match kind {
            SegmentKind::System => self.system.is_some(),
            SegmentKind::User => self.user.is_some(),
        }
    }

    /// Read and decode every segment that has a decoder. Segments without
    /// one are never read.
    pub(crate) fn decode<F: Read + Seek>(
        &self,
        reader: &mut F,
        header: &ModelHeader,
    ) -> Result<SegmentRecords, ModelError> {
        let system_data = match &self.system {
            Some(decoder) => decode_one(reader, header, SegmentKind::System, decoder.as_ref())?,
            None => BTreeMap::new(),
        };
        let user_data = match &self.user {
            Some(decoder) => decode_one(reader, header, SegmentKind::User, decoder.as_ref())?,
            None => BTreeMap::new(),
        };
        Ok((system_data, user_data))
    }
}

impl fmt::Debug for SegmentDecoders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentDecoders")
            .field("system", &self.system.is_some())
            .field("user", &self.user.is_some())
            .finish()
    }
}

fn decode_one<F, R>(
    reader: &mut F,
    header: &ModelHeader,
    kind: SegmentKind,
    decoder: &dyn SegmentDecoder<R>,
) -> Result<BTreeMap<String, R>, ModelError>
where
    F: Read + Seek,
{
    let payload = read_segment(reader, header, kind)?;
    let records = decoder.decode(&payload)?;
    debug!(%kind, bytes = payload.len(), records = records.len(), "segment decoded");
    Ok(records)
}
