//! rid-core: Pure segmentation, decode, and tracking library for
//! broadcast Remote ID advertisements.
//!
//! No async, no I/O — just algorithms plus the device registry. This
//! crate is the shared core used by `rid-monitor` and any other
//! consumer of the live device view.

pub mod decode;
pub mod record;
pub mod registry;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types at crate root
pub use decode::{decode_block, sanitize};
pub use record::{DroneRecord, OperatorInfo, Telemetry, TypeSet, STALE_TIMEOUT};
pub use registry::{IngestOutcome, Registry};
pub use scan::{extract_messages, Advertisement, DeviceKey};
pub use types::*;
