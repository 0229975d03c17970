//! Correlation attribute types
//!
//! A correlation attribute instance records that a value (an MD5, an
//! e-mail address, a phone number, ...) was seen in a given case and data
//! source. Its identity is the [`InstanceKey`]; only the known status and
//! the comment ever change.

use serde::{Deserialize, Serialize};

use super::known::KnownStatus;

pub const FILES_TYPE_ID: i32 = 0;
pub const DOMAIN_TYPE_ID: i32 = 1;
pub const EMAIL_TYPE_ID: i32 = 2;
pub const PHONE_TYPE_ID: i32 = 3;
pub const USBID_TYPE_ID: i32 = 4;
pub const SSID_TYPE_ID: i32 = 5;
pub const MAC_TYPE_ID: i32 = 6;
pub const IMEI_TYPE_ID: i32 = 7;
pub const IMSI_TYPE_ID: i32 = 8;
pub const ICCID_TYPE_ID: i32 = 9;

/// First id available to account-backed types added at runtime
pub const ADDITIONAL_TYPES_BASE_ID: i32 = 1000;

/// A correlation attribute type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationType {
    pub id: i32,
    pub display_name: String,
    /// Base name of the `<name>_instances` table
    pub db_table_name: String,
    pub supported: bool,
    pub enabled: bool,
}

impl CorrelationType {
    pub fn new(id: i32, display_name: &str, db_table_name: &str, supported: bool, enabled: bool) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            db_table_name: db_table_name.to_string(),
            supported,
            enabled,
        }
    }

    /// Name of the table holding instances of this type
    pub fn instance_table_name(&self) -> String {
        format!("{}_instances", self.db_table_name)
    }

    /// Name of the reference-set table of this type
    pub fn reference_table_name(&self) -> String {
        format!("reference_{}", self.db_table_name)
    }

    /// Whether an account record backs values of this type
    pub fn has_account(&self) -> bool {
        self.id >= ADDITIONAL_TYPES_BASE_ID || self.id == PHONE_TYPE_ID || self.id == EMAIL_TYPE_ID
    }

    /// Whether values of this type can be written
    pub fn is_usable(&self) -> bool {
        self.supported && self.enabled
    }
}

/// The correlation types every repository starts with
pub fn default_correlation_types() -> Vec<CorrelationType> {
    vec![
        CorrelationType::new(FILES_TYPE_ID, "Files", "file", true, true),
        CorrelationType::new(DOMAIN_TYPE_ID, "Domains", "domain", true, true),
        CorrelationType::new(EMAIL_TYPE_ID, "Email Addresses", "email_address", true, true),
        CorrelationType::new(PHONE_TYPE_ID, "Phone Numbers", "phone_number", true, true),
        CorrelationType::new(USBID_TYPE_ID, "USB Devices", "usb_devices", true, true),
        CorrelationType::new(SSID_TYPE_ID, "Wireless Networks", "wireless_networks", true, true),
        CorrelationType::new(MAC_TYPE_ID, "MAC Addresses", "mac_address", true, true),
        CorrelationType::new(IMEI_TYPE_ID, "IMEI Number", "imei_number", true, true),
        CorrelationType::new(IMSI_TYPE_ID, "IMSI Number", "imsi_number", true, true),
        CorrelationType::new(ICCID_TYPE_ID, "ICCID Number", "iccid_number", true, true),
    ]
}

/// Look up a default correlation type by id
pub fn default_correlation_type(id: i32) -> Option<CorrelationType> {
    default_correlation_types().into_iter().find(|t| t.id == id)
}

/// Identity of a correlation attribute instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub type_id: i32,
    pub case_id: i64,
    pub data_source_id: i64,
    /// Normalized correlation value
    pub value: String,
    /// Lower-cased path of the file or artifact source
    pub file_path: String,
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type={} case={} ds={} value={} path={}",
            self.type_id, self.case_id, self.data_source_id, self.value, self.file_path
        )
    }
}

/// A stored correlation attribute instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationAttributeInstance {
    pub key: InstanceKey,
    pub known_status: KnownStatus,
    pub comment: Option<String>,
    /// Object id of the file or artifact source in the case database
    pub object_id: Option<i64>,
}

/// An attribute derived from a file or artifact, before the case and data
/// source have been resolved to repository records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationAttribute {
    pub type_id: i32,
    pub value: String,
    pub file_path: String,
    pub data_source_object_id: i64,
    pub object_id: i64,
}

impl CorrelationAttribute {
    /// Bind the attribute to resolved repository records
    pub fn into_key(self, case_id: i64, data_source_id: i64) -> InstanceKey {
        InstanceKey {
            type_id: self.type_id,
            case_id,
            data_source_id,
            value: self.value,
            file_path: self.file_path,
        }
    }
}
