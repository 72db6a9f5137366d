//! One-time bearer secrets for the email-verify and password-reset flows.
//!
//! These are opaque strings compared by exact equality against the stored
//! value; they carry no claims and are not self-describing. Expiry, where a
//! flow needs one, is tracked next to the stored token.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// 32 bytes of OS entropy, 256 bits.
const TOKEN_BYTES: usize = 32;

/// Generate an unguessable, URL-safe one-time token.
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to draw entropy for one-time token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
