//! Per-device aggregate state and the merge rules that build it.
//!
//! A `DroneRecord` is born empty at first sight and accrues fields as
//! messages arrive. Fields are only ever replaced by a more specific,
//! non-empty value — a later, less-informative message never resets
//! anything to empty. Whole sensor samples (Location, System) are
//! replaced as one unit, never stitched together from different
//! messages.

use serde::Serialize;

use crate::decode::{sanitize, AUTH_PREVIEW_LEN};
use crate::scan::DeviceKey;
use crate::types::*;

/// Device considered stale after this many seconds of silence.
pub const STALE_TIMEOUT: f64 = 20.0;

// ---------------------------------------------------------------------------
// Aggregate field groups
// ---------------------------------------------------------------------------

/// One coherent position/velocity sample from a Location message.
/// Stored as a unit so a merge can never mix subfields from two samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: i32,
    pub height_m: i32,
    pub speed_h_ms: f64,
    pub speed_v_ms: f64,
    pub heading_deg: u16,
    pub status: FlightStatus,
}

/// Operator position and classification from a System message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatorInfo {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: i32,
    pub classification: UaClassification,
}

/// Set of message-type ids observed for a device, kept for debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeSet(u8);

impl TypeSet {
    pub fn insert(&mut self, mt: MessageType) {
        self.0 |= 1 << mt.id();
    }

    pub fn contains(&self, mt: MessageType) -> bool {
        self.0 & (1 << mt.id()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TypeSet {
    /// Comma-joined type ids in ascending order, e.g. "0,1,4".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for id in 0..6u8 {
            if self.0 & (1 << id) != 0 {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{id}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for TypeSet {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// DroneRecord
// ---------------------------------------------------------------------------

/// Mutable aggregate state for a single observed device.
///
/// Owned exclusively by the registry; all mutation happens under its
/// lock. Cloned wholesale into consumer snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroneRecord {
    pub key: DeviceKey,
    pub rssi: i8,

    // Identity
    pub serial: Option<String>,
    pub ua_type: Option<UaType>,

    // Telemetry / operator
    pub telemetry: Option<Telemetry>,
    pub operator: Option<OperatorInfo>,

    // Text / auth
    pub self_id: Option<String>,
    pub operator_id: Option<String>,
    /// First bytes of the auth blob, uppercase hex.
    pub auth_preview: Option<String>,

    // Bookkeeping
    pub first_seen: f64,
    pub last_seen: f64,
    pub msg_count: u64,
    pub seen_types: TypeSet,
}

impl DroneRecord {
    pub fn new(key: DeviceKey, timestamp: f64) -> Self {
        DroneRecord {
            key,
            rssi: 0,
            serial: None,
            ua_type: None,
            telemetry: None,
            operator: None,
            self_id: None,
            operator_id: None,
            auth_preview: None,
            first_seen: timestamp,
            last_seen: timestamp,
            msg_count: 0,
            seen_types: TypeSet::default(),
        }
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_seen
    }

    pub fn is_stale(&self, now: f64) -> bool {
        self.age(now) > STALE_TIMEOUT
    }

    /// Merge one decoded message into the record.
    ///
    /// Envelope fields (rssi, last_seen) are refreshed once per
    /// advertisement by the registry, not here.
    pub fn apply(&mut self, msg: &DecodedMessage) {
        match msg {
            DecodedMessage::BasicId(m) => {
                self.ua_type = Some(m.ua_type);
                if let Some(id) = sanitize(&m.uas_id) {
                    // Longer-or-equal identifier wins: assumed more complete.
                    // Policy choice, not a correctness guarantee; a
                    // transmitter may legitimately shorten its reported id.
                    let keep_current = self
                        .serial
                        .as_ref()
                        .is_some_and(|cur| id.len() < cur.len());
                    if !keep_current {
                        self.serial = Some(id);
                    }
                }
            }
            DecodedMessage::Location(m) => {
                // Whole-sample overwrite.
                self.telemetry = Some(Telemetry {
                    lat: m.lat,
                    lon: m.lon,
                    alt_m: m.alt_baro_m,
                    height_m: m.height_m,
                    speed_h_ms: m.speed_h_ms,
                    speed_v_ms: m.speed_v_ms,
                    heading_deg: m.heading_deg,
                    status: m.status,
                });
            }
            DecodedMessage::Auth(m) => {
                let n = (m.length as usize).min(m.data.len()).min(AUTH_PREVIEW_LEN);
                self.auth_preview = Some(hex_encode(&m.data[..n]));
            }
            DecodedMessage::SelfId(m) => {
                if let Some(desc) = sanitize(&m.desc) {
                    self.self_id = Some(desc);
                }
            }
            DecodedMessage::System(m) => {
                // Whole-tuple overwrite.
                self.operator = Some(OperatorInfo {
                    lat: m.operator_lat,
                    lon: m.operator_lon,
                    alt_m: m.operator_alt_m,
                    classification: m.classification,
                });
            }
            DecodedMessage::OperatorId(m) => {
                if let Some(id) = sanitize(&m.operator_id) {
                    self.operator_id = Some(id);
                }
            }
        }
        self.msg_count += 1;
        self.seen_types.insert(msg.msg_type());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_block;
    use crate::testutil::*;
    use crate::types::{LinkPhy, MessageType};

    fn make_record() -> DroneRecord {
        let key = DeviceKey {
            mac: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF],
            phy: LinkPhy::Legacy,
        };
        DroneRecord::new(key, 1.0)
    }

    fn decoded(block: [u8; crate::decode::BLOCK_LEN]) -> DecodedMessage {
        decode_block(&block).expect("valid test block")
    }

    #[test]
    fn test_new_record_is_empty() {
        let rec = make_record();
        assert!(rec.serial.is_none());
        assert!(rec.telemetry.is_none());
        assert!(rec.operator.is_none());
        assert_eq!(rec.msg_count, 0);
        assert!(rec.seen_types.is_empty());
    }

    #[test]
    fn test_basic_id_populates_serial_and_type() {
        let mut rec = make_record();
        rec.apply(&decoded(basic_id_block("N12345", 2)));
        assert_eq!(rec.serial.as_deref(), Some("N12345"));
        assert_eq!(rec.ua_type, Some(UaType::Helicopter));
        assert_eq!(rec.msg_count, 1);
        assert!(rec.seen_types.contains(MessageType::BasicId));
    }

    #[test]
    fn test_serial_shorter_incoming_loses() {
        let mut rec = make_record();
        rec.apply(&decoded(basic_id_block("AB", 2)));
        rec.apply(&decoded(basic_id_block("A", 2)));
        assert_eq!(rec.serial.as_deref(), Some("AB"));
        // Vehicle type still overwritten by the rejected-id message.
        assert_eq!(rec.msg_count, 2);
    }

    #[test]
    fn test_serial_longer_incoming_wins() {
        let mut rec = make_record();
        rec.apply(&decoded(basic_id_block("AB", 2)));
        rec.apply(&decoded(basic_id_block("ABC", 2)));
        assert_eq!(rec.serial.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_serial_equal_length_incoming_wins() {
        // Length-or-equal wins is a policy choice, not a correctness rule;
        // this test documents the behavior rather than justifying it.
        let mut rec = make_record();
        rec.apply(&decoded(basic_id_block("AB", 2)));
        rec.apply(&decoded(basic_id_block("XY", 2)));
        assert_eq!(rec.serial.as_deref(), Some("XY"));
    }

    #[test]
    fn test_serial_sanitized_before_compare() {
        let mut rec = make_record();
        rec.apply(&decoded(basic_id_block("ABCD", 2)));
        // Raw field is longer but sanitizes to a single char, so it loses.
        let mut block = basic_id_block("", 2);
        block[2..8].copy_from_slice(b"X\x01\x01\x01\x01\x01");
        rec.apply(&decoded(block));
        assert_eq!(rec.serial.as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_location_overwrites_as_unit() {
        let mut rec = make_record();
        rec.apply(&decoded(location_block(37.0, -122.0, 2)));
        let first = rec.telemetry.expect("telemetry set");
        assert_eq!(first.lat, 37.0);
        assert_eq!(first.status, FlightStatus::Airborne);

        // Second sample replaces every subfield, including ones the first
        // sample had set to something else.
        let mut block = location_block(38.0, -121.0, 1);
        block[2] = 45;
        rec.apply(&decoded(block));
        let second = rec.telemetry.expect("telemetry set");
        assert_eq!(second.lat, 38.0);
        assert_eq!(second.lon, -121.0);
        assert_eq!(second.status, FlightStatus::Ground);
        assert_eq!(second.heading_deg, 45);
    }

    #[test]
    fn test_auth_preview_truncated_to_16_bytes() {
        let mut rec = make_record();
        let data = [0xAB; 17];
        let mut block = auth_block(1, &data);
        block[3] = 17; // declared length exceeds the preview bound
        rec.apply(&decoded(block));
        let preview = rec.auth_preview.as_deref().unwrap();
        assert_eq!(preview.len(), AUTH_PREVIEW_LEN * 2);
        assert!(preview.chars().all(|c| c == 'A' || c == 'B'));
    }

    #[test]
    fn test_auth_preview_respects_declared_length() {
        let mut rec = make_record();
        rec.apply(&decoded(auth_block(1, &[0xDE, 0xAD])));
        assert_eq!(rec.auth_preview.as_deref(), Some("DEAD"));
    }

    #[test]
    fn test_self_id_empty_after_sanitize_keeps_prior() {
        let mut rec = make_record();
        rec.apply(&decoded(self_id_block("Survey")));
        let mut block = self_id_block("");
        block[2] = 0x01; // non-empty field, sanitizes to nothing
        rec.apply(&decoded(block));
        assert_eq!(rec.self_id.as_deref(), Some("Survey"));
        assert_eq!(rec.msg_count, 2);
    }

    #[test]
    fn test_system_populates_operator() {
        let mut rec = make_record();
        rec.apply(&decoded(system_block(37.1, -122.1)));
        let op = rec.operator.expect("operator set");
        assert_eq!(op.lat, 37.1);
        assert_eq!(op.classification, UaClassification::EuOpen);
    }

    #[test]
    fn test_operator_id_sanitized_overwrite() {
        let mut rec = make_record();
        rec.apply(&decoded(operator_id_block("FIN87astrdge12k8")));
        assert_eq!(rec.operator_id.as_deref(), Some("FIN87astrdge12k8"));
    }

    #[test]
    fn test_seen_types_accumulate() {
        let mut rec = make_record();
        rec.apply(&decoded(location_block(37.0, -122.0, 2)));
        rec.apply(&decoded(basic_id_block("N12345", 2)));
        rec.apply(&decoded(system_block(37.1, -122.1)));
        assert_eq!(rec.seen_types.to_string(), "0,1,4");
        assert_eq!(rec.msg_count, 3);
    }

    #[test]
    fn test_staleness_window() {
        let mut rec = make_record();
        rec.last_seen = 100.0;
        assert!(!rec.is_stale(119.0));
        assert!(!rec.is_stale(120.0)); // exactly at the window edge
        assert!(rec.is_stale(121.0));
    }

    #[test]
    fn test_typeset_display_empty() {
        assert_eq!(TypeSet::default().to_string(), "");
    }
}
