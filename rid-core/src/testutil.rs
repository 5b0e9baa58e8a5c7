//! Test-only byte-level encoders for protocol blocks and advertisements.

use crate::decode::BLOCK_LEN;
use crate::scan::Advertisement;
use crate::types::{mac_from_str, LinkPhy};

pub fn basic_id_block(serial: &str, ua_type: u8) -> [u8; BLOCK_LEN] {
    assert!(serial.len() <= 20);
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x02; // type 0, protocol version 2
    b[1] = (1 << 4) | (ua_type & 0x0F); // id-type 1: serial number
    b[2..2 + serial.len()].copy_from_slice(serial.as_bytes());
    b
}

pub fn location_block(lat: f64, lon: f64, status: u8) -> [u8; BLOCK_LEN] {
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x12;
    b[1] = (status & 0x0F) << 4;
    b[5..9].copy_from_slice(&((lat * 1e7) as i32).to_le_bytes());
    b[9..13].copy_from_slice(&((lon * 1e7) as i32).to_le_bytes());
    b
}

pub fn auth_block(auth_type: u8, data: &[u8]) -> [u8; BLOCK_LEN] {
    assert!(data.len() <= 17);
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x22;
    b[1] = (auth_type & 0x0F) << 4; // page 0
    b[3] = data.len() as u8;
    b[8..8 + data.len()].copy_from_slice(data);
    b
}

pub fn self_id_block(desc: &str) -> [u8; BLOCK_LEN] {
    assert!(desc.len() <= 23);
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x32;
    b[2..2 + desc.len()].copy_from_slice(desc.as_bytes());
    b
}

pub fn system_block(op_lat: f64, op_lon: f64) -> [u8; BLOCK_LEN] {
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x42;
    b[2..6].copy_from_slice(&((op_lat * 1e7) as i32).to_le_bytes());
    b[6..10].copy_from_slice(&((op_lon * 1e7) as i32).to_le_bytes());
    b[17] = 1 << 4; // EU Open category
    b
}

pub fn operator_id_block(id: &str) -> [u8; BLOCK_LEN] {
    assert!(id.len() <= 20);
    let mut b = [0u8; BLOCK_LEN];
    b[0] = 0x52;
    b[2..2 + id.len()].copy_from_slice(id.as_bytes());
    b
}

pub fn zero_block() -> [u8; BLOCK_LEN] {
    [0u8; BLOCK_LEN]
}

/// Wrap message blocks in a BLE service-data envelope: flags AD structure,
/// then length/type bytes and the 0xFFFA service UUID anchor.
pub fn payload_with_blocks(blocks: &[[u8; BLOCK_LEN]]) -> Vec<u8> {
    let mut p = vec![0x02, 0x01, 0x06, 0x1E, 0x16, 0xFA, 0xFF];
    for b in blocks {
        p.extend_from_slice(b);
    }
    p
}

pub fn adv(mac: &str, payload: Vec<u8>, timestamp: f64) -> Advertisement {
    Advertisement {
        mac: mac_from_str(mac).expect("valid test MAC"),
        phy: LinkPhy::Legacy,
        rssi: -60,
        payload,
        timestamp,
    }
}
