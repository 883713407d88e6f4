//! Opaque keyset cursors.
//!
//! A token encodes the sort key of the last row handed out (distance and id in
//! proximity mode, id in worldwide mode) together with a fingerprint of the
//! filters and box it was issued under. Tokens presented against a different
//! request decode as [`Decoded::Stale`].

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PlaceSummary;
use crate::{filters::FilterState, geo::BoundingBox};

const TOKEN_VERSION: u8 = 1;

/// Sort key of the last row of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorPosition {
    pub id: u32,
    /// Present in proximity mode only.
    pub distance: Option<f64>,
}

/// Outcome of decoding a token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    Valid(CursorPosition),
    /// Well formed, but issued for other filters or another box.
    Stale,
    Malformed,
}

#[derive(Serialize, Deserialize)]
struct Token {
    v: u8,
    fp: String,
    id: u32,
    /// Raw `f64` bits, so the distance survives the trip exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<u64>,
}

/// Encodes and decodes cursors for one filter + box combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPager {
    fingerprint: String,
}

impl CursorPager {
    #[must_use]
    pub fn new(filters: &FilterState, bounds: &BoundingBox) -> Self {
        Self {
            fingerprint: fingerprint(filters, bounds),
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn encode(&self, last_row: &PlaceSummary) -> String {
        self.encode_position(CursorPosition {
            id: last_row.id,
            distance: last_row.distance,
        })
    }

    #[must_use]
    pub fn encode_position(&self, position: CursorPosition) -> String {
        let token = Token {
            v: TOKEN_VERSION,
            fp: self.fingerprint.clone(),
            id: position.id,
            d: position.distance.map(f64::to_bits),
        };
        // A struct of plain integers and a string always serializes.
        let json = serde_json::to_vec(&token).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    #[must_use]
    pub fn decode(&self, token: &str) -> Decoded {
        let Ok(bytes) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            debug!("Cursor is not valid base64");
            return Decoded::Malformed;
        };
        let token: Token = match serde_json::from_slice(&bytes) {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "Cursor payload is not a cursor");
                return Decoded::Malformed;
            }
        };
        if token.v != TOKEN_VERSION || token.fp != self.fingerprint {
            return Decoded::Stale;
        }
        let distance = token.d.map(f64::from_bits);
        if distance.is_some_and(|d| !d.is_finite()) {
            return Decoded::Malformed;
        }
        Decoded::Valid(CursorPosition {
            id: token.id,
            distance,
        })
    }
}

fn fingerprint(filters: &FilterState, bounds: &BoundingBox) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(filters.query_key().as_bytes());
    for edge in [bounds.north, bounds.south, bounds.east, bounds.west] {
        hasher.update(&edge.to_bits().to_le_bytes());
    }
    let hash = hasher.finalize();
    hash.to_hex()[..32].to_string()
}
