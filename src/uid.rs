//
// uid.rs
// XNAT-RTStruct-rs
//
// Fresh DICOM identifiers and creation stamps for re-encoded objects.
//

use chrono::{DateTime, Local};
use uuid::Uuid;

pub const MANUFACTURER: &str = "XNAT DataChooser";
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A UUID-derived UID under the `2.25` root (PS3.5 B.2), always at most 64 characters.
pub fn new_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// DICOM DA and TM strings for the given instant.
pub fn creation_stamp(now: DateTime<Local>) -> (String, String) {
    (
        now.format("%Y%m%d").to_string(),
        now.format("%H%M%S").to_string(),
    )
}
