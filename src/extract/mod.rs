//! Correlation attribute extraction
//!
//! Derives the correlation attributes of a file or an artifact. A file
//! yields at most one attribute (its MD5); an artifact yields one attribute
//! per correlatable value, following rules that depend on the artifact
//! type.

pub mod normalize;


use std::collections::HashSet;

use tracing::debug;

use crate::core::types::correlation::{
    DOMAIN_TYPE_ID, EMAIL_TYPE_ID, FILES_TYPE_ID, ICCID_TYPE_ID, IMEI_TYPE_ID, IMSI_TYPE_ID,
    MAC_TYPE_ID, PHONE_TYPE_ID, SSID_TYPE_ID, USBID_TYPE_ID,
};
use crate::core::types::{ArtifactInfo, ArtifactType, AttributeKind, CorrelationAttribute, FileInfo};

/// Derives correlation attributes from case content
pub trait AttributeExtractor: Send + Sync {
    /// Attributes of a file
    fn derive_file(&self, file: &FileInfo) -> Vec<CorrelationAttribute>;

    /// Attributes of an artifact
    fn derive_artifact(&self, artifact: &ArtifactInfo) -> Vec<CorrelationAttribute>;
}

type Normalizer = fn(&str) -> Option<String>;

/// A rule mapping one attribute kind to one correlation type
struct ExtractionRule {
    kind: AttributeKind,
    type_id: i32,
    normalize: Normalizer,
    /// Attribute holds a list of values
    multi_valued: bool,
}

const fn rule(kind: AttributeKind, type_id: i32, normalize: Normalizer) -> ExtractionRule {
    ExtractionRule {
        kind,
        type_id,
        normalize,
        multi_valued: false,
    }
}

const fn list_rule(kind: AttributeKind, type_id: i32, normalize: Normalizer) -> ExtractionRule {
    ExtractionRule {
        kind,
        type_id,
        normalize,
        multi_valued: true,
    }
}

const WEB_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::Domain, DOMAIN_TYPE_ID, normalize::normalize_domain),
    rule(AttributeKind::Url, DOMAIN_TYPE_ID, normalize::normalize_domain),
];

const CONTACT_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::Email, EMAIL_TYPE_ID, normalize::normalize_email),
    rule(AttributeKind::PhoneNumber, PHONE_TYPE_ID, normalize::normalize_phone),
    rule(AttributeKind::PhoneNumberHome, PHONE_TYPE_ID, normalize::normalize_phone),
    rule(AttributeKind::PhoneNumberMobile, PHONE_TYPE_ID, normalize::normalize_phone),
    rule(AttributeKind::PhoneNumberOffice, PHONE_TYPE_ID, normalize::normalize_phone),
];

const COMMUNICATION_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::PhoneNumber, PHONE_TYPE_ID, normalize::normalize_phone),
    rule(AttributeKind::PhoneNumberFrom, PHONE_TYPE_ID, normalize::normalize_phone),
    rule(AttributeKind::PhoneNumberTo, PHONE_TYPE_ID, normalize::normalize_phone),
];

const EMAIL_MSG_RULES: &[ExtractionRule] = &[
    list_rule(AttributeKind::EmailFrom, EMAIL_TYPE_ID, normalize::normalize_email),
    list_rule(AttributeKind::EmailTo, EMAIL_TYPE_ID, normalize::normalize_email),
    list_rule(AttributeKind::EmailCc, EMAIL_TYPE_ID, normalize::normalize_email),
];

const DEVICE_ATTACHED_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::DeviceId, USBID_TYPE_ID, normalize::normalize_usb_id),
    rule(AttributeKind::MacAddress, MAC_TYPE_ID, normalize::normalize_mac),
];

const WIFI_NETWORK_RULES: &[ExtractionRule] =
    &[rule(AttributeKind::Ssid, SSID_TYPE_ID, normalize::normalize_ssid)];

const MAC_RULES: &[ExtractionRule] =
    &[rule(AttributeKind::MacAddress, MAC_TYPE_ID, normalize::normalize_mac)];

const SIM_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::Iccid, ICCID_TYPE_ID, normalize::normalize_iccid),
    rule(AttributeKind::Imsi, IMSI_TYPE_ID, normalize::normalize_imsi),
];

const DEVICE_INFO_RULES: &[ExtractionRule] = &[
    rule(AttributeKind::Imei, IMEI_TYPE_ID, normalize::normalize_imei),
    rule(AttributeKind::Imsi, IMSI_TYPE_ID, normalize::normalize_imsi),
    rule(AttributeKind::Iccid, ICCID_TYPE_ID, normalize::normalize_iccid),
];

fn rules_for(artifact_type: ArtifactType) -> &'static [ExtractionRule] {
    match artifact_type {
        ArtifactType::WebBookmark
        | ArtifactType::WebCookie
        | ArtifactType::WebDownload
        | ArtifactType::WebHistory => WEB_RULES,
        ArtifactType::Contact => CONTACT_RULES,
        ArtifactType::Message | ArtifactType::CallLog => COMMUNICATION_RULES,
        ArtifactType::EmailMsg => EMAIL_MSG_RULES,
        ArtifactType::DeviceAttached => DEVICE_ATTACHED_RULES,
        ArtifactType::WifiNetwork => WIFI_NETWORK_RULES,
        ArtifactType::WifiNetworkAdapter | ArtifactType::BluetoothPairing => MAC_RULES,
        ArtifactType::SimAttached => SIM_RULES,
        ArtifactType::DeviceInfo => DEVICE_INFO_RULES,
        ArtifactType::Other => &[],
    }
}

/// Extraction rules of the default correlation types
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttributeExtractor;

impl DefaultAttributeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl AttributeExtractor for DefaultAttributeExtractor {
    fn derive_file(&self, file: &FileInfo) -> Vec<CorrelationAttribute> {
        let Some(raw) = file.md5.as_deref() else {
            return Vec::new();
        };
        let Some(md5) = normalize::normalize_md5(raw) else {
            debug!(file = file.object_id, md5 = raw, "Skipping file with malformed MD5");
            return Vec::new();
        };

        vec![CorrelationAttribute {
            type_id: FILES_TYPE_ID,
            value: md5,
            file_path: file.full_path().to_lowercase(),
            data_source_object_id: file.data_source_object_id,
            object_id: file.object_id,
        }]
    }

    fn derive_artifact(&self, artifact: &ArtifactInfo) -> Vec<CorrelationAttribute> {
        let file_path = artifact.source_path.to_lowercase();
        let mut seen = HashSet::new();
        let mut attributes = Vec::new();

        for rule in rules_for(artifact.artifact_type) {
            for raw in artifact.values_of(rule.kind) {
                let candidates: Vec<&str> = if rule.multi_valued {
                    raw.split(&[',', ';'][..]).collect()
                } else {
                    vec![raw]
                };

                for candidate in candidates {
                    let Some(value) = (rule.normalize)(candidate) else {
                        if !candidate.trim().is_empty() {
                            debug!(
                                artifact = artifact.artifact_id,
                                kind = ?rule.kind,
                                value = candidate,
                                "Skipping value that cannot be correlated"
                            );
                        }
                        continue;
                    };
                    if seen.insert((rule.type_id, value.clone())) {
                        attributes.push(CorrelationAttribute {
                            type_id: rule.type_id,
                            value,
                            file_path: file_path.clone(),
                            data_source_object_id: artifact.data_source_object_id,
                            object_id: artifact.source_content_id,
                        });
                    }
                }
            }
        }

        attributes
    }
}
