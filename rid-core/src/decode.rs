//! Decode 25-byte Remote ID message blocks into typed payloads.
//!
//! One decoder per message-type selector:
//! - 0: BasicId    (serial identifier + vehicle type)
//! - 1: Location   (position/velocity/status sample)
//! - 2: Auth       (authentication blob page)
//! - 3: SelfId     (free-text self-description)
//! - 4: System     (operator position + UAS classification)
//! - 5: OperatorId (operator registration identifier)
//!
//! Byte layouts follow ASTM F3411 broadcast encoding. Each decoder is a
//! pure bounded read: any 25-byte input either yields a payload or the
//! protocol-defined "no value" signal (`None`), never a panic.

use crate::types::*;

/// Fixed size of one protocol message block.
pub const BLOCK_LEN: usize = 25;

/// Auth preview retained per device, in raw bytes (rendered as hex).
pub const AUTH_PREVIEW_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn read_i32(block: &[u8; BLOCK_LEN], off: usize) -> i32 {
    i32::from_le_bytes([block[off], block[off + 1], block[off + 2], block[off + 3]])
}

fn read_u16(block: &[u8; BLOCK_LEN], off: usize) -> u16 {
    u16::from_le_bytes([block[off], block[off + 1]])
}

/// Altitude fields are u16 with 0.5 m resolution offset by -1000 m.
fn decode_altitude(raw: u16) -> i32 {
    (raw as f64 * 0.5 - 1000.0) as i32
}

/// Filter a raw fixed-width text field down to a safe printable subset.
///
/// Stops at the first NUL, keeps ASCII alphanumerics plus `-`, `.` and
/// space, drops everything else. `None` when nothing survives, so callers
/// can leave a previously merged value untouched instead of overwriting
/// it with an empty string.
pub fn sanitize(field: &[u8]) -> Option<String> {
    let mut out = String::new();
    for &b in field {
        if b == 0 {
            break;
        }
        let c = b as char;
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ' ' {
            out.push(c);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Decode one candidate block.
///
/// Returns `None` for anything the segmenter should slide past: wrong
/// length, the all-zero padding sentinel in the header byte, a selector
/// outside 0-5, or a per-type "no value" payload.
pub fn decode_block(block: &[u8]) -> Option<DecodedMessage> {
    let block: &[u8; BLOCK_LEN] = block.try_into().ok()?;

    // All-zero header is the documented no-data sentinel; never decode it
    // even though some per-type decoders would not otherwise reject it.
    if block[0] == 0x00 {
        return None;
    }

    match MessageType::from_nibble(block[0] >> 4)? {
        MessageType::BasicId => decode_basic_id(block).map(DecodedMessage::BasicId),
        MessageType::Location => decode_location(block).map(DecodedMessage::Location),
        MessageType::Auth => decode_auth(block).map(DecodedMessage::Auth),
        MessageType::SelfId => decode_self_id(block).map(DecodedMessage::SelfId),
        MessageType::System => decode_system(block).map(DecodedMessage::System),
        MessageType::OperatorId => decode_operator_id(block).map(DecodedMessage::OperatorId),
    }
}

// ---------------------------------------------------------------------------
// Per-type decoders
// ---------------------------------------------------------------------------

/// Type 0. No-value: identifier field is empty.
pub fn decode_basic_id(block: &[u8; BLOCK_LEN]) -> Option<BasicIdMsg> {
    let mut uas_id = [0u8; 20];
    uas_id.copy_from_slice(&block[2..22]);
    if uas_id[0] == 0 {
        return None;
    }
    Some(BasicIdMsg {
        id_type: block[1] >> 4,
        ua_type: UaType::from_code(block[1] & 0x0F),
        uas_id,
    })
}

/// Type 1. No-value: latitude is exactly zero.
pub fn decode_location(block: &[u8; BLOCK_LEN]) -> Option<LocationMsg> {
    let raw_lat = read_i32(block, 5);
    if raw_lat == 0 {
        return None;
    }

    let flags = block[1] & 0x0F;
    let east_west = flags & 0b0010 != 0; // direction segment: add 180
    let speed_mult = flags & 0b0001 != 0;

    let heading_deg = block[2] as u16 + if east_west { 180 } else { 0 };
    let speed_h_ms = if speed_mult {
        block[3] as f64 * 0.75 + 255.0 * 0.25
    } else {
        block[3] as f64 * 0.25
    };
    let speed_v_ms = (block[4] as i8) as f64 * 0.5;

    Some(LocationMsg {
        status: FlightStatus::from_code(block[1] >> 4),
        lat: raw_lat as f64 / 1e7,
        lon: read_i32(block, 9) as f64 / 1e7,
        alt_baro_m: decode_altitude(read_u16(block, 13)),
        alt_geo_m: decode_altitude(read_u16(block, 15)),
        height_m: decode_altitude(read_u16(block, 17)),
        speed_h_ms,
        speed_v_ms,
        heading_deg,
    })
}

/// Type 2. No-value: declared authentication type is "none" (0).
pub fn decode_auth(block: &[u8; BLOCK_LEN]) -> Option<AuthMsg> {
    let auth_type = block[1] >> 4;
    if auth_type == 0 {
        return None;
    }
    let page = block[1] & 0x0F;
    if page == 0 {
        // Page 0: last-page index, declared length, timestamp, 17 data bytes.
        Some(AuthMsg {
            auth_type,
            page,
            length: block[3],
            data: block[8..25].to_vec(),
        })
    } else {
        // Later pages carry 23 data bytes and no length field.
        Some(AuthMsg {
            auth_type,
            page,
            length: 23,
            data: block[2..25].to_vec(),
        })
    }
}

/// Type 3. No-value: description field is empty.
pub fn decode_self_id(block: &[u8; BLOCK_LEN]) -> Option<SelfIdMsg> {
    let mut desc = [0u8; 23];
    desc.copy_from_slice(&block[2..25]);
    if desc[0] == 0 {
        return None;
    }
    Some(SelfIdMsg {
        desc_type: block[1],
        desc,
    })
}

/// Type 4. No-value: operator latitude is exactly zero.
pub fn decode_system(block: &[u8; BLOCK_LEN]) -> Option<SystemMsg> {
    let raw_lat = read_i32(block, 2);
    if raw_lat == 0 {
        return None;
    }
    Some(SystemMsg {
        location_type: block[1] & 0x03,
        operator_lat: raw_lat as f64 / 1e7,
        operator_lon: read_i32(block, 6) as f64 / 1e7,
        operator_alt_m: decode_altitude(read_u16(block, 18)),
        classification: UaClassification::from_category(block[17] >> 4),
    })
}

/// Type 5. No-value: identifier field is empty.
pub fn decode_operator_id(block: &[u8; BLOCK_LEN]) -> Option<OperatorIdMsg> {
    let mut operator_id = [0u8; 20];
    operator_id.copy_from_slice(&block[2..22]);
    if operator_id[0] == 0 {
        return None;
    }
    Some(OperatorIdMsg {
        id_type: block[1],
        operator_id,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
