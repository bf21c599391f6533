//! Gateway callback signature verification.
//!
//! The gateway signs its payment callback with HMAC-SHA256 over
//! `"{order_id}|{gateway_payment_id}"` using the shared key secret, hex
//! encoded. Verification recomputes the MAC and compares in constant time;
//! the expected value never leaves this module.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(order_id: &str, gateway_payment_id: &str, secret: &str) -> HmacSha256 {
    // new_from_slice accepts any key length for SHA-256.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    mac
}

/// Compute the hex-encoded signature the gateway is expected to send.
/// Used by tests and by gateway simulators; verification itself goes
/// through [`verify`].
pub fn sign(order_id: &str, gateway_payment_id: &str, secret: &str) -> String {
    hex::encode(mac_for(order_id, gateway_payment_id, secret).finalize().into_bytes())
}

/// Constant-time verification of a supplied hex signature.
///
/// Malformed hex verifies as false; no detail about the failure is exposed.
pub fn verify(order_id: &str, gateway_payment_id: &str, secret: &str, supplied: &str) -> bool {
    let Ok(supplied_bytes) = hex::decode(supplied) else {
        return false;
    };
    mac_for(order_id, gateway_payment_id, secret)
        .verify_slice(&supplied_bytes)
        .is_ok()
}
