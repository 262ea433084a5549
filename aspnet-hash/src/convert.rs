use base64::Engine as _;

use crate::error::Error;
use crate::{BASE64, MIN_BLOB_LEN, MVC4_SALT_LEN};

/// One input line of convert mode, split into its optional username and the
/// base64 payload. Both are raw bytes; usernames need not be UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredRecord<'a> {
    pub username: Option<&'a [u8]>,
    pub payload: &'a [u8],
}

impl<'a> StoredRecord<'a> {
    /// Splits `line` at the first `delimiter` when one is given.
    ///
    /// The username is kept verbatim; the payload is trimmed of ASCII
    /// whitespace. Without a delimiter the whole trimmed line is the payload.
    pub fn parse(line: &'a [u8], delimiter: Option<&[u8]>) -> Result<Self, Error> {
        match delimiter {
            Some(delimiter) => {
                let (username, payload) =
                    split_once(line, delimiter).ok_or_else(|| Error::MissingDelimiter {
                        delimiter: String::from_utf8_lossy(delimiter).into_owned(),
                    })?;
                Ok(Self { username: Some(username), payload: payload.trim_ascii() })
            }
            None => Ok(Self { username: None, payload: line.trim_ascii() }),
        }
    }
}

fn split_once<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    if needle.is_empty() {
        return Some((&haystack[..0], haystack));
    }
    let at = haystack.windows(needle.len()).position(|w| w == needle)?;
    Some((&haystack[..at], &haystack[at + needle.len()..]))
}

/// Binary form of an MVC4 hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    /// Leading format byte. Not interpreted.
    pub format_marker: u8,
    pub salt: [u8; MVC4_SALT_LEN],
    /// Everything after the salt; 32 bytes for hashes ASP.NET produced.
    pub digest: Vec<u8>,
}

impl DecodedBlob {
    /// Decodes a base64 payload. At least [`MIN_BLOB_LEN`] bytes are
    /// required; the digest may be empty.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        let bytes = BASE64.decode(payload)?;
        if bytes.len() < MIN_BLOB_LEN {
            return Err(Error::TooShort { len: bytes.len(), min: MIN_BLOB_LEN });
        }

        let mut salt = [0u8; MVC4_SALT_LEN];
        salt.copy_from_slice(&bytes[1..MIN_BLOB_LEN]);

        Ok(Self { format_marker: bytes[0], salt, digest: bytes[MIN_BLOB_LEN..].to_vec() })
    }

    /// Formats the blob as a hashcat mode 12000 line.
    ///
    /// `iterations` is written as given. The blob does not carry it, so a
    /// value that differs from the one used at generation time produces a
    /// line that will never crack.
    pub fn to_hashcat_line(&self, username: Option<&[u8]>, iterations: u32) -> Vec<u8> {
        let fields = format!(
            "sha1:{iterations}:{}:{}",
            BASE64.encode(self.salt),
            BASE64.encode(&self.digest)
        );

        match username {
            Some(username) => {
                let mut line = Vec::with_capacity(username.len() + 1 + fields.len());
                line.extend_from_slice(username);
                line.push(b':');
                line.extend_from_slice(fields.as_bytes());
                line
            }
            None => fields.into_bytes(),
        }
    }
}

/// Converts one stored MVC4 hash line into a hashcat mode 12000 line.
///
/// `delimiter` is `Some` when lines are prefixed with `<username><delimiter>`.
pub fn convert(line: &[u8], delimiter: Option<&[u8]>, iterations: u32) -> Result<Vec<u8>, Error> {
    let record = StoredRecord::parse(line, delimiter)?;
    let blob = DecodedBlob::decode(record.payload)?;
    Ok(blob.to_hashcat_line(record.username, iterations))
}
