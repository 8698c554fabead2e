// Field rules for the national ID card. Every rule is a pure function of one
// side's canonical text and answers `None` when nothing matches.
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::models::rules::{
    terminating_labels, ADDRESS_LABELS, ID_NUMBER_LABELS, ID_NUMBER_VALUE, SEX_LABELS,
};
use crate::models::{CanonicalText, IdentityField, IdentityRecord, Side};

fn alternation<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("|")
}

lazy_static! {
    static ref UPPERCASE_TOKEN: Regex = Regex::new(r"[A-Z]{2,}").unwrap();
    static ref ID_NUMBER: Regex = Regex::new(&format!(
        r"(?i:{})\s*[:.]?\s*({})",
        alternation(ID_NUMBER_LABELS),
        ID_NUMBER_VALUE
    ))
    .unwrap();
    // OCR often glues a date to the word before it, so only digits guard the
    // left edge. The right edge is checked in `extract_date`.
    static ref DATE: Regex =
        Regex::new(r"(?:^|[^0-9])([0-9]{2}[./][0-9]{2}[./][0-9]{4})").unwrap();
    static ref ADDRESS: Regex = Regex::new(&format!(
        r"(?i:{})\s*:?\s*(.*?)\s*(?:{}|$)",
        alternation(ADDRESS_LABELS),
        alternation(&terminating_labels())
    ))
    .unwrap();
    static ref SEX: Regex = Regex::new(&format!(
        r"(?i)(?:{})\s*:?\s*([MF])\b",
        alternation(SEX_LABELS)
    ))
    .unwrap();
    static ref CIVIL_STATUS: Regex =
        Regex::new(r"(?:^|[^0-9/.])([0-9]+/[0-9]{4})(?:[^0-9/]|$)").unwrap();
}

pub struct FieldExtractor;

impl FieldExtractor {
    /// Build the record from both sides. Always succeeds; missing fields
    /// stay `None`.
    pub fn extract(front: &CanonicalText, back: &CanonicalText) -> IdentityRecord {
        if front.side() != Side::Front || back.side() != Side::Back {
            warn!(
                "Extractor received {} text as front and {} text as back",
                front.side(),
                back.side()
            );
        }

        let mut record = IdentityRecord::default();
        for field in IdentityField::ALL {
            let text = match field.side() {
                Side::Front => front,
                Side::Back => back,
            };
            let value = Self::extract_field(field, text.as_str());
            if value.is_none() {
                debug!("{} not found on {} side", field, field.side());
            }
            *record.field_mut(field) = value;
        }
        record
    }

    pub fn extract_field(field: IdentityField, text: &str) -> Option<String> {
        match field {
            IdentityField::IdNumber => Self::extract_id_number(text),
            IdentityField::FirstName => Self::extract_uppercase_token(text, 0),
            IdentityField::LastName => Self::extract_uppercase_token(text, 1),
            IdentityField::BirthPlace => Self::extract_uppercase_token(text, 2),
            IdentityField::BirthDate => Self::extract_date(text, 0),
            IdentityField::ExpiryDate => Self::extract_date(text, 1),
            IdentityField::Address => Self::extract_address(text),
            IdentityField::Sex => Self::extract_sex(text),
            IdentityField::CivilStatus => Self::extract_civil_status(text),
        }
    }

    /// Runs of two or more uppercase Latin letters, in reading order.
    ///
    /// Names and birthplace are taken purely by position among these. There
    /// is no label to anchor on, so a stray uppercase run left by OCR noise
    /// shifts every later position.
    pub fn uppercase_tokens(text: &str) -> Vec<&str> {
        UPPERCASE_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
    }

    fn extract_uppercase_token(text: &str, position: usize) -> Option<String> {
        UPPERCASE_TOKEN
            .find_iter(text)
            .nth(position)
            .map(|m| m.as_str().to_string())
    }

    /// Letters and digits following a numbering label, e.g. `N° AB123456`.
    pub fn extract_id_number(text: &str) -> Option<String> {
        ID_NUMBER
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// The `index`-th `DD.MM.YYYY` / `DD/MM/YYYY` date. The card prints the
    /// birth date first and the expiry date second.
    pub fn extract_date(text: &str, index: usize) -> Option<String> {
        DATE.captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .filter(|m| !text[m.end()..].starts_with(|c: char| c.is_ascii_digit()))
            .nth(index)
            .map(|m| m.as_str().to_string())
    }

    /// Everything between the address label and the next label (or the end).
    pub fn extract_address(text: &str) -> Option<String> {
        ADDRESS
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim())
            .filter(|address| !address.is_empty())
            .map(str::to_string)
    }

    pub fn extract_sex(text: &str) -> Option<String> {
        SEX.captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    /// `<digits>/<year>` such as `05/2020`, ignoring pieces of full dates.
    pub fn extract_civil_status(text: &str) -> Option<String> {
        CIVIL_STATUS
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::TextNormalizer;

    fn canonical(side: Side, text: &str) -> CanonicalText {
        CanonicalText::new(side, TextNormalizer::normalize(text))
    }

    #[test]
    fn test_dates_in_order() {
        let text = "Né le 12.03.1990 valable jusqu'au 01/01/2030";
        assert_eq!(FieldExtractor::extract_date(text, 0).as_deref(), Some("12.03.1990"));
        assert_eq!(FieldExtractor::extract_date(text, 1).as_deref(), Some("01/01/2030"));
        assert_eq!(FieldExtractor::extract_date(text, 2), None);
    }

    #[test]
    fn test_dates_glued_to_words() {
        let text = "Né le12.03.1990 jusqu'au01/01/2030";
        assert_eq!(FieldExtractor::extract_date(text, 0).as_deref(), Some("12.03.1990"));
        assert_eq!(FieldExtractor::extract_date(text, 1).as_deref(), Some("01/01/2030"));
        assert_eq!(
            FieldExtractor::extract_date("RABAT12.03.1990 01.01.2030", 1).as_deref(),
            Some("01.01.2030")
        );
    }

    #[test]
    fn test_dates_extra_ignored_and_missing() {
        let text = "01.02.2000 03.04.2010 05.06.2020";
        assert_eq!(FieldExtractor::extract_date(text, 1).as_deref(), Some("03.04.2010"));
        assert_eq!(FieldExtractor::extract_date("12.03.1990", 1), None);
        assert_eq!(FieldExtractor::extract_date("12-03-1990 123.03.1990", 0), None);
    }

    #[test]
    fn test_id_number() {
        assert_eq!(
            FieldExtractor::extract_id_number("N° AB123456").as_deref(),
            Some("AB123456")
        );
        assert_eq!(
            FieldExtractor::extract_id_number("carte no: X998877 valable").as_deref(),
            Some("X998877")
        );
        assert_eq!(
            FieldExtractor::extract_id_number("NUMERO BE45").as_deref(),
            Some("BE45")
        );
        // value letters must be uppercase
        assert_eq!(FieldExtractor::extract_id_number("N° ab123456"), None);
        assert_eq!(FieldExtractor::extract_id_number("AB123456"), None);
        assert_eq!(FieldExtractor::extract_id_number("NOM ALAMI"), None);
    }

    #[test]
    fn test_address_stops_at_next_label() {
        assert_eq!(
            FieldExtractor::extract_address("Adresse 12 RUE HASSAN Sexe M").as_deref(),
            Some("12 RUE HASSAN")
        );
        assert_eq!(
            FieldExtractor::extract_address("ADRESSE: 7 AV MOHAMMED V CASABLANCA").as_deref(),
            Some("7 AV MOHAMMED V CASABLANCA")
        );
        assert_eq!(
            FieldExtractor::extract_address("العنوان 3 زنقة الورد الجنس M").as_deref(),
            Some("3 زنقة الورد")
        );
        assert_eq!(FieldExtractor::extract_address("Adresse Sexe M"), None);
        assert_eq!(
            FieldExtractor::extract_address("Adresse 12 RUE X N° AB123456").as_deref(),
            Some("12 RUE X")
        );
        assert_eq!(FieldExtractor::extract_address("12 RUE HASSAN"), None);
    }

    #[test]
    fn test_address_keeps_house_number_markers() {
        assert_eq!(
            FieldExtractor::extract_address("Adresse N° 12 RUE HASSAN Sexe M").as_deref(),
            Some("N° 12 RUE HASSAN")
        );
        assert_eq!(
            FieldExtractor::extract_address("Adresse 12 RUE NO 5 HAY SALAM Sexe M").as_deref(),
            Some("12 RUE NO 5 HAY SALAM")
        );
    }

    #[test]
    fn test_sex() {
        assert_eq!(FieldExtractor::extract_sex("Sexe F").as_deref(), Some("F"));
        assert_eq!(FieldExtractor::extract_sex("SEXE: m 05/2020").as_deref(), Some("M"));
        assert_eq!(FieldExtractor::extract_sex("Sexe MOHAMED"), None);
        assert_eq!(FieldExtractor::extract_sex("Adresse 12 RUE X"), None);
    }

    #[test]
    fn test_civil_status() {
        assert_eq!(
            FieldExtractor::extract_civil_status("Sexe M 05/2020").as_deref(),
            Some("05/2020")
        );
        assert_eq!(
            FieldExtractor::extract_civil_status("123/1999 end").as_deref(),
            Some("123/1999")
        );
        assert_eq!(FieldExtractor::extract_civil_status("valide 01/01/2030"), None);
        assert_eq!(FieldExtractor::extract_civil_status("05/20201"), None);
        assert_eq!(FieldExtractor::extract_civil_status(""), None);
    }

    #[test]
    fn test_uppercase_tokens_positional() {
        let text = "MOHAMED ALAMI né à RABAT le 12.03.1990";
        assert_eq!(
            FieldExtractor::uppercase_tokens(text),
            vec!["MOHAMED", "ALAMI", "RABAT"]
        );
        assert_eq!(
            FieldExtractor::extract_field(IdentityField::BirthPlace, text).as_deref(),
            Some("RABAT")
        );
        assert_eq!(
            FieldExtractor::extract_field(IdentityField::LastName, "MOHAMED A.").as_deref(),
            None
        );
    }

    #[test]
    fn test_no_match_yields_none_for_every_field() {
        for field in IdentityField::ALL {
            assert_eq!(FieldExtractor::extract_field(field, ""), None, "{}", field);
            assert_eq!(
                FieldExtractor::extract_field(field, "rien a lire ici"),
                None,
                "{}",
                field
            );
        }
    }

    #[test]
    fn test_extract_full_record() {
        let front = canonical(
            Side::Front,
            "ROYAUME DU MAROC ... MOHAMED ALAMI RABAT 12.03.1990 01.01.2030",
        );
        let back = canonical(Side::Back, "N° AB123456 Adresse 12 RUE X Sexe M 05/2020");

        let record = FieldExtractor::extract(&front, &back);
        assert_eq!(
            record,
            IdentityRecord {
                id_number: Some("AB123456".to_string()),
                first_name: Some("MOHAMED".to_string()),
                last_name: Some("ALAMI".to_string()),
                birth_date: Some("12.03.1990".to_string()),
                expiry_date: Some("01.01.2030".to_string()),
                birth_place: Some("RABAT".to_string()),
                address: Some("12 RUE X".to_string()),
                sex: Some("M".to_string()),
                civil_status: Some("05/2020".to_string()),
            }
        );
    }

    #[test]
    fn test_rules_stay_on_their_side() {
        // Back-side content on the front is not picked up, and vice versa.
        let front = canonical(Side::Front, "Sexe F 05/2020");
        let back = canonical(Side::Back, "MOHAMED ALAMI 12.03.1990");

        let record = FieldExtractor::extract(&front, &back);
        assert_eq!(record.sex, None);
        assert_eq!(record.civil_status, None);
        assert_eq!(record.birth_date, None);
        assert_eq!(record.first_name, None);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let front = canonical(Side::Front, "HASSAN BENNANI FES 01.01.1980 02/02/2028");
        let back = canonical(Side::Back, "N° C7654 Adresse HAY NAHDA Sexe M 3/2001");

        let first = FieldExtractor::extract(&front, &back);
        for _ in 0..10 {
            assert_eq!(FieldExtractor::extract(&front, &back), first);
        }
        assert_eq!(first.found_count(), 9);
    }
}
