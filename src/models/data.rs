use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::IdentityField;

/// Physical side of the card. Decides which rules run on which text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

/// An uploaded photograph, as received.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub side: Side,
    pub bytes: Vec<u8>,
}

impl RawPage {
    pub fn new(side: Side, bytes: Vec<u8>) -> Self {
        RawPage { side, bytes }
    }
}

/// Image bytes after the preprocessing pipeline (or the original bytes when
/// preprocessing fell back).
#[derive(Debug, Clone)]
pub struct PreprocessedPage {
    pub side: Side,
    pub bytes: Vec<u8>,
}

/// Text as returned by the OCR engine, bound to the side it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub side: Side,
    pub text: String,
    /// Mean word confidence in `0.0..=1.0`, when the engine reports one.
    pub mean_confidence: Option<f32>,
}

/// Recognized text after whitespace collapsing and boilerplate removal.
///
/// Only [`TextNormalizer`](crate::processing::TextNormalizer) builds these, so
/// the text never holds leading/trailing or repeated whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalText {
    side: Side,
    text: String,
}

impl CanonicalText {
    pub(crate) fn new(side: Side, text: String) -> Self {
        CanonicalText { side, text }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Structured fields read off the card. `None` means the rule ran and found
/// nothing; it is never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub id_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub expiry_date: Option<String>,
    pub birth_place: Option<String>,
    pub address: Option<String>,
    pub sex: Option<String>,
    pub civil_status: Option<String>,
}

impl IdentityRecord {
    pub fn get(&self, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::IdNumber => self.id_number.as_deref(),
            IdentityField::FirstName => self.first_name.as_deref(),
            IdentityField::LastName => self.last_name.as_deref(),
            IdentityField::BirthDate => self.birth_date.as_deref(),
            IdentityField::ExpiryDate => self.expiry_date.as_deref(),
            IdentityField::BirthPlace => self.birth_place.as_deref(),
            IdentityField::Address => self.address.as_deref(),
            IdentityField::Sex => self.sex.as_deref(),
            IdentityField::CivilStatus => self.civil_status.as_deref(),
        }
    }

    pub fn field_mut(&mut self, field: IdentityField) -> &mut Option<String> {
        match field {
            IdentityField::IdNumber => &mut self.id_number,
            IdentityField::FirstName => &mut self.first_name,
            IdentityField::LastName => &mut self.last_name,
            IdentityField::BirthDate => &mut self.birth_date,
            IdentityField::ExpiryDate => &mut self.expiry_date,
            IdentityField::BirthPlace => &mut self.birth_place,
            IdentityField::Address => &mut self.address,
            IdentityField::Sex => &mut self.sex,
            IdentityField::CivilStatus => &mut self.civil_status,
        }
    }

    /// Number of fields that were found.
    pub fn found_count(&self) -> usize {
        IdentityField::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }
}

/// Raw OCR output per side, returned for debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawText {
    pub front: String,
    pub back: String,
}

/// Successful extraction response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub data: IdentityRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<RawText>,
}

/// Body returned on fatal failure. Never carries internal diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn generic() -> Self {
        ErrorResponse {
            error: "Failed to process ID card".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes_camel_case_with_nulls() {
        let response = ScanResponse {
            success: true,
            data: IdentityRecord {
                id_number: Some("AB123456".to_string()),
                civil_status: Some("05/2020".to_string()),
                ..Default::default()
            },
            raw_text: Some(RawText {
                front: "front".to_string(),
                back: "back".to_string(),
            }),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["idNumber"], "AB123456");
        assert_eq!(json["data"]["civilStatus"], "05/2020");
        assert!(json["data"]["firstName"].is_null());
        assert_eq!(json["rawText"]["back"], "back");
    }

    #[test]
    fn test_raw_text_omitted_when_disabled() {
        let response = ScanResponse {
            success: true,
            data: IdentityRecord::default(),
            raw_text: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("rawText").is_none());
    }

    #[test]
    fn test_generic_error_body() {
        let json = serde_json::to_string(&ErrorResponse::generic()).unwrap();
        assert_eq!(json, r#"{"error":"Failed to process ID card"}"#);
    }

    #[test]
    fn test_found_count() {
        let mut record = IdentityRecord::default();
        assert_eq!(record.found_count(), 0);
        record.sex = Some("F".to_string());
        *record.field_mut(IdentityField::Address) = Some("12 RUE X".to_string());
        assert_eq!(record.found_count(), 2);
        assert_eq!(record.get(IdentityField::Address), Some("12 RUE X"));
        assert_eq!(record.get(IdentityField::IdNumber), None);
    }
}
