//! Deterministic seed derivation.
//!
//! Every random stream in the crate is derived from a stable string
//! identity: the session code, a purpose tag, and (where per-participant)
//! the participant id. Streams with different purposes are independent, so
//! changing how many draws one consumer makes never shifts another
//! consumer's sequence.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Purpose tags. Append only — renaming one reseeds its stream.
pub const PURPOSE_PRICES: &str = "prices";
pub const PURPOSE_URGENCY: &str = "urgency";
pub const PURPOSE_UI_ORDER: &str = "ui-order";

fn digest(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

/// First 8 digest bytes as a big-endian u64.
pub fn derive_seed(parts: &[&str]) -> u64 {
    let d = digest(parts);
    u64::from_be_bytes([d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]])
}

/// Hex fingerprint of the full digest, for logs and run stamps.
pub fn seed_fingerprint(parts: &[&str]) -> String {
    hex::encode(digest(parts))
}

/// Session-scoped stream for one purpose.
pub fn session_stream(session: &str, purpose: &str) -> StdRng {
    StdRng::seed_from_u64(derive_seed(&[session, purpose]))
}

/// Participant-scoped stream for one purpose.
pub fn participant_stream(session: &str, purpose: &str, participant: &str) -> StdRng {
    StdRng::seed_from_u64(derive_seed(&[session, purpose, participant]))
}
