//! Locate and segment the Remote ID payload inside a raw advertisement.
//!
//! Advertisements arrive with unknown alignment: the protocol region is
//! found by scanning for the 0xFFFA service UUID anchor, and blocks are
//! pulled out with a greedy cursor that hops 25 bytes on a successful
//! decode and slides 1 byte on failure. The slide tolerates an
//! off-by-a-few-bytes anchor or interleaved non-protocol bytes without
//! abandoning the whole advertisement.

use crate::decode::{decode_block, BLOCK_LEN};
use crate::types::{DecodedMessage, LinkPhy, Mac};

/// Shortest advertisement that can carry any protocol content.
const MIN_ADV_LEN: usize = 15;

/// Service UUID 0xFFFA as it appears on air (little endian).
const ANCHOR: [u8; 2] = [0xFA, 0xFF];

// ---------------------------------------------------------------------------
// Advertisement envelope
// ---------------------------------------------------------------------------

/// One radio event's payload plus its envelope. Transient: consumed
/// synchronously by the ingest path and not retained.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub mac: Mac,
    pub phy: LinkPhy,
    pub rssi: i8,
    pub payload: Vec<u8>,
    /// Arrival time, unix seconds.
    pub timestamp: f64,
}

impl Advertisement {
    /// The registry key this advertisement belongs to. Same MAC on a
    /// different PHY is a different device.
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            mac: self.mac,
            phy: self.phy,
        }
    }
}

/// Identity of one tracked device: (radio address, link PHY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DeviceKey {
    #[serde(serialize_with = "crate::types::serde_mac")]
    pub mac: Mac,
    pub phy: LinkPhy,
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Segment an advertisement payload into decoded messages.
///
/// `None` means the advertisement is not Remote ID at all (too short, or
/// no anchor). `Some(vec)` may be empty: an anchored advertisement with
/// no decodable blocks still counts as a sighting of the device.
pub fn extract_messages(payload: &[u8]) -> Option<Vec<DecodedMessage>> {
    if payload.len() < MIN_ADV_LEN {
        return None;
    }
    let start = find_anchor(payload)?;
    let region = &payload[start..];

    let mut messages = Vec::new();
    let mut cursor = 0;
    while cursor + BLOCK_LEN <= region.len() {
        match decode_block(&region[cursor..cursor + BLOCK_LEN]) {
            Some(msg) => {
                messages.push(msg);
                // Block-aligned once correctly anchored.
                cursor += BLOCK_LEN;
            }
            None => {
                // Sliding-window recovery.
                cursor += 1;
            }
        }
    }
    Some(messages)
}

/// Find the anchor marker and return the offset just past it.
/// The marker must start within the first `len - 3` bytes.
fn find_anchor(payload: &[u8]) -> Option<usize> {
    let limit = payload.len() - 3;
    (0..limit)
        .find(|&i| payload[i] == ANCHOR[0] && payload[i + 1] == ANCHOR[1])
        .map(|i| i + 2)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
