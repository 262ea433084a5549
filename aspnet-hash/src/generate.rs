use base64::Engine as _;
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::scheme::{HashParameters, HashScheme};
use crate::{BASE64, MVC4_FORMAT_MARKER};

/// Length of a SHA-256 digest in bytes.
const SHA256_LEN: usize = 32;

/// Hashes `plaintext` under `scheme` with a fresh salt from the OS RNG.
///
/// `plaintext` is hashed as raw bytes, whatever its encoding. Returns the
/// stored representation exactly as ASP.NET would keep it, with no trailing
/// newline. See the crate docs for both layouts.
pub fn generate(
    plaintext: &[u8],
    scheme: HashScheme,
    params: &HashParameters,
) -> Result<String, Error> {
    generate_with_rng(plaintext, scheme, params, &mut OsRng)
}

/// Same as [`generate`], drawing the salt from `rng`.
///
/// A failing `rng` is reported as [`Error::Randomness`]; no hash is produced
/// from a partially filled salt.
pub fn generate_with_rng<R: RngCore + ?Sized>(
    plaintext: &[u8],
    scheme: HashScheme,
    params: &HashParameters,
    rng: &mut R,
) -> Result<String, Error> {
    let mut salt = vec![0u8; params.effective_salt_size(scheme)];
    rng.try_fill_bytes(&mut salt).map_err(Error::Randomness)?;

    Ok(match scheme {
        HashScheme::Mvc4 => encode_mvc4(plaintext, &salt, params),
        HashScheme::WebForms => encode_webforms(plaintext, &salt),
    })
}

/// PBKDF2-HMAC-SHA1 of `plaintext` into `len` bytes.
#[inline]
pub(crate) fn derive_subkey(plaintext: &[u8], salt: &[u8], iterations: u32, len: usize) -> Vec<u8> {
    let mut subkey = vec![0u8; len];
    pbkdf2::pbkdf2_hmac::<Sha1>(plaintext, salt, iterations, &mut subkey);
    subkey
}

// base64(0x00 | salt | subkey)
fn encode_mvc4(plaintext: &[u8], salt: &[u8], params: &HashParameters) -> String {
    let subkey = derive_subkey(plaintext, salt, params.iterations, params.subkey_length);

    let mut blob = Vec::with_capacity(1 + salt.len() + subkey.len());
    blob.push(MVC4_FORMAT_MARKER);
    blob.extend_from_slice(salt);
    blob.extend_from_slice(&subkey);

    BASE64.encode(&blob)
}

// base64(salt | sha256(plaintext)),base64(salt)
fn encode_webforms(plaintext: &[u8], salt: &[u8]) -> String {
    let digest: [u8; SHA256_LEN] = Sha256::digest(plaintext).into();

    let mut blob = Vec::with_capacity(salt.len() + SHA256_LEN);
    blob.extend_from_slice(salt);
    blob.extend_from_slice(&digest);

    let mut line = BASE64.encode(&blob);
    line.push(',');
    BASE64.encode_string(salt, &mut line);
    line
}
