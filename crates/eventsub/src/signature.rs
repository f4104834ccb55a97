//! EventSub webhook signature verification.
//!
//! Every delivery is signed with `HMAC-SHA256(secret, id || timestamp || body)`
//! and the result is sent as `sha256=<lowercase hex>` in
//! [`MESSAGE_SIGNATURE`].

use {
    hmac::{Hmac, Mac},
    http::HeaderMap,
    sha2::Sha256,
    tracing::{debug, warn},
};

type HmacSha256 = Hmac<Sha256>;

pub const MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
pub const MESSAGE_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
pub const MESSAGE_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";
pub const MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a delivery.
pub fn compute_signature(secret: &[u8], message_id: &str, timestamp: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, including empty.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Check a delivery's signature header against the shared secret.
pub fn verify(
    message_id: &str,
    timestamp: &str,
    signature_header: &str,
    body: &[u8],
    secret: &[u8],
) -> bool {
    if !signature_header.starts_with(SIGNATURE_PREFIX) {
        warn!("invalid signature header format (missing sha256= prefix)");
        return false;
    }

    let expected = compute_signature(secret, message_id, timestamp, body);
    if expected.is_empty() {
        return false;
    }

    constant_time_eq(expected.as_bytes(), signature_header.as_bytes())
}

/// Why a delivery was refused before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingHeader,
    InvalidSignature,
    /// Signature valid, but older than the configured replay window.
    Stale,
}

/// Signing headers of a delivery whose signature checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedHeaders<'a> {
    pub message_id: &'a str,
    pub timestamp: &'a str,
}

/// Read the three signing headers of a request and verify them.
///
/// A missing or non-UTF-8 header is [`RejectReason::MissingHeader`].
pub fn check_headers<'a>(
    headers: &'a HeaderMap,
    body: &[u8],
    secret: &[u8],
) -> Result<VerifiedHeaders<'a>, RejectReason> {
    let (Some(message_id), Some(timestamp), Some(signature)) = (
        header_str(headers, MESSAGE_ID),
        header_str(headers, MESSAGE_TIMESTAMP),
        header_str(headers, MESSAGE_SIGNATURE),
    ) else {
        debug!("delivery is missing a signing header");
        return Err(RejectReason::MissingHeader);
    };
    if !verify(message_id, timestamp, signature, body, secret) {
        return Err(RejectReason::InvalidSignature);
    }
    Ok(VerifiedHeaders {
        message_id,
        timestamp,
    })
}

/// Boolean form of [`check_headers`].
pub fn verify_headers(headers: &HeaderMap, body: &[u8], secret: &[u8]) -> bool {
    check_headers(headers, body, secret).is_ok()
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Constant-time byte comparison.
///
/// The length check leaks only the length, which is fixed for valid
/// signatures; every byte of equal-length inputs is always visited.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
