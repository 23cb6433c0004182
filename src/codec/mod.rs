// Encoding of stats document snapshots: JSON for export, versioned wincode blobs for compact copies.

mod blob;
mod output;

pub use output::RootedOutput;

use tracing::debug;

use crate::error::CodecError;
use crate::models::ServiceStatsSnapshot;
use crate::registry::ServiceStats;

pub fn to_json(document: &ServiceStatsSnapshot) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn from_json(s: &str) -> Result<ServiceStatsSnapshot, CodecError> {
    Ok(serde_json::from_str(s)?)
}

/// Pretty JSON bytes of `document`, failing if they exceed `max_size`.
pub fn encode_json(
    document: &ServiceStatsSnapshot,
    max_size: usize,
) -> Result<Vec<u8>, CodecError> {
    let json = to_json(document)?;
    let mut out = RootedOutput::new(Vec::with_capacity(json.len()), max_size, document);
    out.write(json.as_bytes())?;
    Ok(out.into_bytes())
}

/// Encodes `document` as `[version][wincode payload]`, failing if it exceeds `max_size` bytes.
pub fn encode_document(
    document: &ServiceStatsSnapshot,
    max_size: usize,
) -> Result<Vec<u8>, CodecError> {
    let payload = wincode::serialize(document).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut out = RootedOutput::new(Vec::with_capacity(1 + payload.len()), max_size, document);
    blob::write_versioned(&mut out, blob::DOCUMENT_VERSION, &payload)?;
    debug!(
        kind = %out.root().kind,
        entries = out.root().entries.len(),
        bytes = out.len(),
        "document encoded"
    );
    Ok(out.into_bytes())
}

pub fn decode_document(bytes: &[u8]) -> Result<ServiceStatsSnapshot, CodecError> {
    let (version, payload) = blob::split_version(bytes)?;
    if version != blob::DOCUMENT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    wincode::deserialize(payload).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Decodes a binary document straight into a live registry.
pub fn decode_registry(bytes: &[u8]) -> Result<ServiceStats, CodecError> {
    Ok(ServiceStats::from_snapshot(decode_document(bytes)?)?)
}
