use std::fmt;
use std::str::FromStr;

use crate::MVC4_SALT_LEN;

/// Which ASP.NET membership provider a hash is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashScheme {
    /// `SimpleMembershipProvider`: PBKDF2-HMAC-SHA1 with a 16-byte salt.
    #[default]
    Mvc4,
    /// `DefaultMembershipProvider`: unsalted SHA-256 stored next to a salt.
    WebForms,
}

impl HashScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashScheme::Mvc4 => "mvc4",
            HashScheme::WebForms => "webforms",
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash scheme {0:?}, expected mvc4 or webforms")]
pub struct UnknownScheme(pub String);

impl FromStr for HashScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("mvc4") {
            Ok(HashScheme::Mvc4)
        } else if s.eq_ignore_ascii_case("webforms") {
            Ok(HashScheme::WebForms)
        } else {
            Err(UnknownScheme(s.to_string()))
        }
    }
}

/// Cryptographic parameters used when generating hashes.
///
/// Changing any of these away from the defaults yields hashes that ASP.NET
/// itself will not accept. When converting, `iterations` must match whatever
/// produced the stored hash since the blob does not record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParameters {
    /// PBKDF2 rounds.
    pub iterations: u32,
    /// PBKDF2 output length in bytes.
    pub subkey_length: usize,
    /// Salt length in bytes. Ignored for MVC4.
    pub salt_size: usize,
}

impl Default for HashParameters {
    fn default() -> Self {
        Self { iterations: 1000, subkey_length: 32, salt_size: MVC4_SALT_LEN }
    }
}

impl HashParameters {
    /// Salt length actually drawn for `scheme`. MVC4 blobs always carry
    /// exactly 16 salt bytes.
    #[inline]
    pub fn effective_salt_size(&self, scheme: HashScheme) -> usize {
        match scheme {
            HashScheme::Mvc4 => MVC4_SALT_LEN,
            HashScheme::WebForms => self.salt_size,
        }
    }
}
