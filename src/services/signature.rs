// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HMAC-SHA256 request signing for the Withings signed OAuth flow.
//!
//! Parameter names are sorted lexicographically and only the *values* are
//! joined with `,`; the hex digest of that string keyed by the client
//! secret is the `signature` form field.

use crate::error::SyncError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a parameter set. Input order does not matter.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> Result<String, SyncError> {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let message = sorted
        .iter()
        .map(|(_, value)| *value)
        .collect::<Vec<_>>()
        .join(",");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SyncError::Signing(format!("HMAC init failed: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
