use std::fmt;

use crate::models::Side;

/// The fields printed on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    IdNumber,
    FirstName,
    LastName,
    BirthDate,
    ExpiryDate,
    BirthPlace,
    Address,
    Sex,
    CivilStatus,
}

impl IdentityField {
    pub const ALL: [IdentityField; 9] = [
        IdentityField::IdNumber,
        IdentityField::FirstName,
        IdentityField::LastName,
        IdentityField::BirthDate,
        IdentityField::ExpiryDate,
        IdentityField::BirthPlace,
        IdentityField::Address,
        IdentityField::Sex,
        IdentityField::CivilStatus,
    ];

    /// Side of the card the field is printed on.
    pub fn side(&self) -> Side {
        match self {
            IdentityField::FirstName
            | IdentityField::LastName
            | IdentityField::BirthPlace
            | IdentityField::BirthDate
            | IdentityField::ExpiryDate => Side::Front,
            IdentityField::IdNumber
            | IdentityField::Address
            | IdentityField::Sex
            | IdentityField::CivilStatus => Side::Back,
        }
    }

    /// Key used in the JSON response.
    pub fn key(&self) -> &'static str {
        match self {
            IdentityField::IdNumber => "idNumber",
            IdentityField::FirstName => "firstName",
            IdentityField::LastName => "lastName",
            IdentityField::BirthDate => "birthDate",
            IdentityField::ExpiryDate => "expiryDate",
            IdentityField::BirthPlace => "birthPlace",
            IdentityField::Address => "address",
            IdentityField::Sex => "sex",
            IdentityField::CivilStatus => "civilStatus",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Header and title phrases printed on both sides. They carry no field data
/// and would otherwise be read as name tokens.
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "ROYAUME DU MAROC",
    "KINGDOM OF MOROCCO",
    "CARTE NATIONALE D'IDENTITE",
    "NATIONAL IDENTITY CARD",
    "DIRECTION GENERALE DE LA SURETE NATIONALE",
    "المملكة المغربية",
    "البطاقة الوطنية للتعريف",
    "المديرية العامة للأمن الوطني",
];

// Label markers, as regex fragments. Case folding is applied by the
// extractors, never here.
pub const ID_NUMBER_LABELS: &[&str] = &[r"\bN\s*[°º]", r"\bN[O0]\b\.?", r"\bNUM[EÉ]RO\b"];
pub const ADDRESS_LABELS: &[&str] = &[r"\bADRESSE\b", r"\bADDRESS\b", "العنوان"];
pub const SEX_LABELS: &[&str] = &[r"\bSEXE\b", r"\bSEX\b", "الجنس"];
pub const CIVIL_STATUS_LABELS: &[&str] = &[r"\b[EÉ]TAT\s+CIVIL\b", "الحالة المدنية"];

/// Shape of the card number: one or two uppercase letters, then digits.
pub const ID_NUMBER_VALUE: &str = r"[A-Z]{1,2}[0-9]+";

/// Patterns that end a free-text field such as the address, each carrying
/// its own case folding.
///
/// `N°` and `No` also mark house numbers inside addresses, so a numbering
/// label only ends the field when a card number follows it.
pub fn terminating_labels() -> Vec<String> {
    let plain = SEX_LABELS
        .iter()
        .chain(CIVIL_STATUS_LABELS)
        .map(|label| format!("(?i:{})", label));
    let numbered = ID_NUMBER_LABELS
        .iter()
        .map(|label| format!(r"(?i:{})\s*[:.]?\s*{}", label, ID_NUMBER_VALUE));
    plain.chain(numbered).collect()
}
