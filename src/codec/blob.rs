// Version prefix for encoded documents: [version: u8][payload].

use super::RootedOutput;
use crate::error::CodecError;

pub(super) const DOCUMENT_VERSION: u8 = 1;

pub(super) fn write_versioned<R: ?Sized>(
    out: &mut RootedOutput<'_, R>,
    version: u8,
    payload: &[u8],
) -> Result<(), CodecError> {
    out.write(&[version])?;
    out.write(payload)
}

/// Splits off the version byte. Empty input has no version and is rejected.
pub(super) fn split_version(bytes: &[u8]) -> Result<(u8, &[u8]), CodecError> {
    match bytes.split_first() {
        Some((version, payload)) => Ok((*version, payload)),
        None => Err(CodecError::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_version_returns_prefix_and_rest() {
        let (version, payload) = split_version(&[1, 7, 8]).unwrap();
        assert_eq!(version, 1);
        assert_eq!(payload, &[7, 8]);
    }

    #[test]
    fn split_version_rejects_empty() {
        assert!(matches!(split_version(&[]), Err(CodecError::Empty)));
    }

    #[test]
    fn write_versioned_prefixes_payload() {
        let root = ();
        let mut out = RootedOutput::new(Vec::new(), 16, &root);
        write_versioned(&mut out, DOCUMENT_VERSION, &[9, 9]).unwrap();
        assert_eq!(out.into_bytes(), vec![DOCUMENT_VERSION, 9, 9]);
    }
}
