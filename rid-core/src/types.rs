//! Shared types, error enum, and decoded message types for rid-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by rid-core and its callers.
///
/// Malformed radio payloads are *not* errors — noise and partial captures
/// are routine, so the decode path reports them as `None`/skip. This enum
/// covers the user-facing surface: capture files and CLI input.
#[derive(Debug, Error)]
pub enum RidError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("unknown link PHY: {0}")]
    UnknownPhy(String),
    #[error("malformed capture line: {0}")]
    InvalidLine(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RidError>;

// ---------------------------------------------------------------------------
// MAC address helpers
// ---------------------------------------------------------------------------

/// 6-byte radio address. Stored as raw bytes to avoid per-event String
/// allocation inside the scan callback path.
pub type Mac = [u8; 6];

/// Format a MAC as colon-separated uppercase hex (`AA:BB:CC:DD:EE:FF`).
pub fn mac_to_string(mac: &Mac) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

/// Parse a colon-separated MAC string. Case-insensitive.
pub fn mac_from_str(s: &str) -> Option<Mac> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for byte in mac.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

/// Serialize a MAC as its display string rather than a byte array.
pub fn serde_mac<S: serde::Serializer>(mac: &Mac, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&mac_to_string(mac))
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Link PHY
// ---------------------------------------------------------------------------

/// Advertising PHY the packet was observed on.
///
/// The same transmitter can broadcast concurrently on legacy and long-range
/// coded PHYs, and the two observations are tracked as distinct devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkPhy {
    /// BLE 4 legacy advertising.
    Legacy,
    /// BLE 5 extended advertising on the long-range coded PHY.
    Coded,
}

impl std::fmt::Display for LinkPhy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkPhy::Legacy => write!(f, "BLE 4"),
            LinkPhy::Coded => write!(f, "BLE 5"),
        }
    }
}

impl std::str::FromStr for LinkPhy {
    type Err = RidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ble4" | "legacy" => Ok(LinkPhy::Legacy),
            "ble5" | "coded" => Ok(LinkPhy::Coded),
            other => Err(RidError::UnknownPhy(other.into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Message type selector
// ---------------------------------------------------------------------------

/// The 4-bit message-type selector carried in a block's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageType {
    BasicId,
    Location,
    Auth,
    SelfId,
    System,
    OperatorId,
}

impl MessageType {
    /// Map a header nibble to a message type. Selectors 6-15 are
    /// unrecognized and treated as decode failures by the segmenter.
    pub fn from_nibble(nibble: u8) -> Option<MessageType> {
        match nibble {
            0 => Some(MessageType::BasicId),
            1 => Some(MessageType::Location),
            2 => Some(MessageType::Auth),
            3 => Some(MessageType::SelfId),
            4 => Some(MessageType::System),
            5 => Some(MessageType::OperatorId),
            _ => None,
        }
    }

    /// Numeric selector value (0-5).
    pub fn id(&self) -> u8 {
        match self {
            MessageType::BasicId => 0,
            MessageType::Location => 1,
            MessageType::Auth => 2,
            MessageType::SelfId => 3,
            MessageType::System => 4,
            MessageType::OperatorId => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Enumerated field values
// ---------------------------------------------------------------------------

/// Vehicle-type classification from the BasicId message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UaType {
    None,
    Aeroplane,
    Helicopter,
    Gyroplane,
    HybridLift,
    Ornithopter,
    Glider,
    Kite,
    FreeBalloon,
    CaptiveBalloon,
    Airship,
    FreeFall,
    Rocket,
    TetheredPowered,
    GroundObstacle,
    Other,
}

impl UaType {
    pub fn from_code(code: u8) -> UaType {
        match code {
            0 => UaType::None,
            1 => UaType::Aeroplane,
            2 => UaType::Helicopter,
            3 => UaType::Gyroplane,
            4 => UaType::HybridLift,
            5 => UaType::Ornithopter,
            6 => UaType::Glider,
            7 => UaType::Kite,
            8 => UaType::FreeBalloon,
            9 => UaType::CaptiveBalloon,
            10 => UaType::Airship,
            11 => UaType::FreeFall,
            12 => UaType::Rocket,
            13 => UaType::TetheredPowered,
            14 => UaType::GroundObstacle,
            _ => UaType::Other,
        }
    }
}

impl std::fmt::Display for UaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display labels sized for a device-list column.
        let s = match self {
            UaType::None => "None",
            UaType::Aeroplane => "Plane",
            UaType::Helicopter => "Copter",
            UaType::Gyroplane => "Gyro",
            UaType::HybridLift => "Hybrid",
            UaType::Ornithopter => "Ornith",
            UaType::Glider => "Glider",
            UaType::Kite => "Kite",
            UaType::FreeBalloon => "Balloon",
            UaType::CaptiveBalloon => "CaptiveBal",
            UaType::Airship => "Airship",
            UaType::FreeFall => "FreeFall",
            UaType::Rocket => "Rocket",
            UaType::TetheredPowered => "Tethered",
            UaType::GroundObstacle => "Obstacle",
            UaType::Other => "Other",
        };
        write!(f, "{s}")
    }
}

/// Flight status from the Location message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlightStatus {
    Undeclared,
    Ground,
    Airborne,
    Emergency,
    RemoteIdFailure,
    Unknown,
}

impl FlightStatus {
    pub fn from_code(code: u8) -> FlightStatus {
        match code {
            0 => FlightStatus::Undeclared,
            1 => FlightStatus::Ground,
            2 => FlightStatus::Airborne,
            3 => FlightStatus::Emergency,
            4 => FlightStatus::RemoteIdFailure,
            _ => FlightStatus::Unknown,
        }
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FlightStatus::Undeclared => "Undeclared",
            FlightStatus::Ground => "Ground",
            FlightStatus::Airborne => "Airborne",
            FlightStatus::Emergency => "Emergency",
            FlightStatus::RemoteIdFailure => "Fail",
            FlightStatus::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// UAS classification category from the System message (EU scheme).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UaClassification {
    Undeclared,
    EuOpen,
    EuSpecific,
    EuCertified,
}

impl UaClassification {
    pub fn from_category(category: u8) -> UaClassification {
        match category {
            1 => UaClassification::EuOpen,
            2 => UaClassification::EuSpecific,
            3 => UaClassification::EuCertified,
            _ => UaClassification::Undeclared,
        }
    }
}

impl std::fmt::Display for UaClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UaClassification::Undeclared => "Undeclared",
            UaClassification::EuOpen => "EU Open",
            UaClassification::EuSpecific => "EU Specific",
            UaClassification::EuCertified => "EU Certified",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// Type 0: serial identifier and vehicle classification.
///
/// The identifier is kept as the raw fixed-width field; sanitization
/// happens at merge time so the merge engine can apply its empty-field
/// guard against the sanitized form.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicIdMsg {
    pub id_type: u8,
    pub ua_type: UaType,
    pub uas_id: [u8; 20],
}

/// Type 1: one coherent position/velocity sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMsg {
    pub status: FlightStatus,
    pub lat: f64,
    pub lon: f64,
    pub alt_baro_m: i32,
    pub alt_geo_m: i32,
    pub height_m: i32,
    pub speed_h_ms: f64,
    pub speed_v_ms: f64,
    pub heading_deg: u16,
}

/// Type 2: one page of the authentication blob.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthMsg {
    pub auth_type: u8,
    pub page: u8,
    /// Declared total length for page 0; page capacity for later pages.
    pub length: u8,
    pub data: Vec<u8>,
}

/// Type 3: free-text self-description, raw fixed-width field.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfIdMsg {
    pub desc_type: u8,
    pub desc: [u8; 23],
}

/// Type 4: operator position and UAS classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMsg {
    pub location_type: u8,
    pub operator_lat: f64,
    pub operator_lon: f64,
    pub operator_alt_m: i32,
    pub classification: UaClassification,
}

/// Type 5: operator registration identifier, raw fixed-width field.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorIdMsg {
    pub id_type: u8,
    pub operator_id: [u8; 20],
}

/// Union type for all decoded messages.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    BasicId(BasicIdMsg),
    Location(LocationMsg),
    Auth(AuthMsg),
    SelfId(SelfIdMsg),
    System(SystemMsg),
    OperatorId(OperatorIdMsg),
}

impl DecodedMessage {
    /// The message-type selector this payload was decoded from.
    pub fn msg_type(&self) -> MessageType {
        match self {
            DecodedMessage::BasicId(_) => MessageType::BasicId,
            DecodedMessage::Location(_) => MessageType::Location,
            DecodedMessage::Auth(_) => MessageType::Auth,
            DecodedMessage::SelfId(_) => MessageType::SelfId,
            DecodedMessage::System(_) => MessageType::System,
            DecodedMessage::OperatorId(_) => MessageType::OperatorId,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_roundtrip() {
        let mac = mac_from_str("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(mac, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(mac_to_string(&mac), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_mac_lowercase() {
        assert_eq!(
            mac_from_str("aa:bb:cc:dd:ee:ff"),
            Some([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
        );
    }

    #[test]
    fn test_mac_invalid() {
        assert!(mac_from_str("AA:BB:CC").is_none()); // too short
        assert!(mac_from_str("AA:BB:CC:DD:EE:FF:00").is_none()); // too long
        assert!(mac_from_str("GG:BB:CC:DD:EE:FF").is_none()); // bad digit
        assert!(mac_from_str("AAB:B:CC:DD:EE:FF").is_none()); // bad grouping
    }

    #[test]
    fn test_hex_decode() {
        assert_eq!(hex_decode("FAFF0D"), Some(vec![0xFA, 0xFF, 0x0D]));
        assert_eq!(hex_decode("abc"), None); // odd length
        assert_eq!(hex_decode("ZZZZ"), None); // invalid chars
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0xFA, 0xFF, 0x0D]), "FAFF0D");
    }

    #[test]
    fn test_message_type_from_nibble() {
        assert_eq!(MessageType::from_nibble(0), Some(MessageType::BasicId));
        assert_eq!(MessageType::from_nibble(5), Some(MessageType::OperatorId));
        assert_eq!(MessageType::from_nibble(6), None);
        assert_eq!(MessageType::from_nibble(0x0F), None);
    }

    #[test]
    fn test_message_type_id_roundtrip() {
        for id in 0..6u8 {
            let mt = MessageType::from_nibble(id).unwrap();
            assert_eq!(mt.id(), id);
        }
    }

    #[test]
    fn test_phy_parse() {
        assert_eq!("ble4".parse::<LinkPhy>().unwrap(), LinkPhy::Legacy);
        assert_eq!("ble5".parse::<LinkPhy>().unwrap(), LinkPhy::Coded);
        assert_eq!("coded".parse::<LinkPhy>().unwrap(), LinkPhy::Coded);
        assert!("wifi".parse::<LinkPhy>().is_err());
    }

    #[test]
    fn test_ua_type_labels() {
        assert_eq!(UaType::from_code(2), UaType::Helicopter);
        assert_eq!(UaType::from_code(2).to_string(), "Copter");
        assert_eq!(UaType::from_code(15), UaType::Other);
    }

    #[test]
    fn test_flight_status_labels() {
        assert_eq!(FlightStatus::from_code(2), FlightStatus::Airborne);
        assert_eq!(FlightStatus::from_code(4).to_string(), "Fail");
        assert_eq!(FlightStatus::from_code(9), FlightStatus::Unknown);
    }
}
