//! Case, data source and content snapshots
//!
//! These describe objects owned by the forensic case database. The
//! repository keeps its own `cases` and `data_sources` rows keyed by them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::known::KnownStatus;

/// The case as known to the case database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseInfo {
    /// Unique case name; the repository upserts by this value
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub examiner: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CaseInfo {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            examiner: None,
            notes: None,
        }
    }
}

/// A case row in the correlation repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationCase {
    pub id: i64,
    pub case_uid: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// A data source as known to the case database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSourceInfo {
    pub object_id: i64,
    pub name: String,
    pub device_id: String,
    #[serde(default)]
    pub md5: Option<String>,
}

/// A data source row in the correlation repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrelationDataSource {
    pub id: i64,
    pub case_id: i64,
    pub device_id: String,
    pub name: String,
    pub object_id: i64,
}

/// A file in the case database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    pub object_id: i64,
    pub data_source_object_id: i64,
    /// Parent path including the trailing separator
    pub parent_path: String,
    pub name: String,
    #[serde(default)]
    pub md5: Option<String>,
    /// File-level known status (hash set lookups)
    #[serde(default)]
    pub known: KnownStatus,
}

impl FileInfo {
    pub fn full_path(&self) -> String {
        format!("{}{}", self.parent_path, self.name)
    }

    pub fn is_known(&self) -> bool {
        self.known == KnownStatus::Known
    }
}

/// Artifact types the attribute extractor understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactType {
    WebBookmark,
    WebCookie,
    WebDownload,
    WebHistory,
    Contact,
    Message,
    EmailMsg,
    CallLog,
    DeviceAttached,
    WifiNetwork,
    WifiNetworkAdapter,
    BluetoothPairing,
    SimAttached,
    DeviceInfo,
    #[serde(other)]
    Other,
}

/// Attribute kinds read by the attribute extractor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKind {
    Url,
    Domain,
    Email,
    EmailFrom,
    EmailTo,
    EmailCc,
    PhoneNumber,
    PhoneNumberFrom,
    PhoneNumberTo,
    PhoneNumberHome,
    PhoneNumberMobile,
    PhoneNumberOffice,
    DeviceId,
    MacAddress,
    Ssid,
    Imei,
    Imsi,
    Iccid,
    #[serde(other)]
    Other,
}

/// A single artifact attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactAttribute {
    pub kind: AttributeKind,
    pub value: String,
}

impl ArtifactAttribute {
    pub fn new(kind: AttributeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// A blackboard artifact in the case database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub artifact_id: i64,
    pub artifact_type: ArtifactType,
    pub source_content_id: i64,
    pub data_source_object_id: i64,
    /// Path of the source content, used as the instance path
    pub source_path: String,
    pub attributes: Vec<ArtifactAttribute>,
}

impl ArtifactInfo {
    /// Values of all attributes of the given kind
    pub fn values_of(&self, kind: AttributeKind) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.value.as_str())
    }
}
