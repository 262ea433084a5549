//! Password hash codec for the two ASP.NET membership providers.
//!
//! This crate builds and parses the stored hash formats used by ASP.NET
//! MVC4 (`SimpleMembershipProvider`, PBKDF2-HMAC-SHA1) and WebForms
//! (`DefaultMembershipProvider`, SHA-256), and reformats MVC4 hashes into the
//! colon-delimited line that hashcat mode 12000 (`PBKDF2-HMAC-SHA1`) accepts.
//!
//! # Formats
//!
//! An MVC4 hash is the base64 of a single blob:
//!
//! ```text
//! 0x00 | salt (16 bytes) | subkey (32 bytes by default)
//! ```
//!
//! A WebForms hash is two base64 fields separated by a comma, the
//! salt-prefixed digest followed by the salt on its own:
//!
//! ```text
//! base64(salt | sha256(password)),base64(salt)
//! ```
//!
//! The WebForms digest does not mix the salt in. That is how the stored
//! format behaves and it is reproduced as-is.
//!
//! Converting an MVC4 hash produces:
//!
//! ```text
//! [username:]sha1:<iterations>:base64(salt):base64(subkey)
//! ```
//!
//! # Usage
//!
//! ```
//! use aspnet_hash::{HashParameters, HashScheme, convert, generate};
//!
//! let params = HashParameters::default();
//! let stored = generate(b"hunter2", HashScheme::Mvc4, &params).unwrap();
//! let line = convert(stored.as_bytes(), None, params.iterations).unwrap();
//! assert!(line.starts_with(b"sha1:1000:"));
//! ```

pub mod convert;
pub mod error;
pub mod generate;
pub mod scheme;

pub use convert::{DecodedBlob, StoredRecord, convert};
pub use error::Error;
pub use generate::{generate, generate_with_rng};
pub use scheme::{HashParameters, HashScheme, UnknownScheme};

/// Salt length carried by every MVC4 blob. Convert assumes it regardless of
/// the configured salt size.
pub const MVC4_SALT_LEN: usize = 16;

/// Smallest decodable MVC4 blob: the format marker plus the salt.
pub const MIN_BLOB_LEN: usize = 1 + MVC4_SALT_LEN;

/// Leading byte of a generated MVC4 blob.
pub const MVC4_FORMAT_MARKER: u8 = 0x00;

/// Standard alphabet, padded output. Decoding tolerates non-zero trailing
/// bits the way the ASP.NET side does.
pub(crate) const BASE64: base64::engine::GeneralPurpose = base64::engine::GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    base64::engine::GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);
