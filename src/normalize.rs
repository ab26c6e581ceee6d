use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::error::{LoadError, ParseError};
use crate::parser::appointment_for;

// ── Entity types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Info,
    Leisure,
    Help,
    Link,
    Service,
}

impl EntityType {
    /// Import order used when no subset is requested.
    pub const ALL: [EntityType; 5] = [
        EntityType::Info,
        EntityType::Leisure,
        EntityType::Help,
        EntityType::Link,
        EntityType::Service,
    ];

    /// Value of `categories.item_type`, also the settings key for the input file.
    pub fn key(self) -> &'static str {
        match self {
            EntityType::Info => "info",
            EntityType::Leisure => "leisure",
            EntityType::Help => "help",
            EntityType::Link => "link",
            EntityType::Service => "service",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityType::Info => "Info",
            EntityType::Leisure => "Leisure",
            EntityType::Help => "Help",
            EntityType::Link => "Link",
            EntityType::Service => "Service",
        }
    }

    /// Column names of the CSV export, in file order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            EntityType::Info => &[
                "name", "category", "address", "web_link", "hours", "language", "free", "coordinates",
            ],
            EntityType::Leisure | EntityType::Link | EntityType::Service => &[
                "category", "name", "address", "web_link", "hours", "language", "free", "coordinates",
            ],
            EntityType::Help => &["name", "web_link", "c", "d", "e", "f", "g", "language", "free"],
        }
    }

    /// Category code for exports that carry no category column.
    pub fn default_category(self) -> Option<&'static str> {
        match self {
            EntityType::Help => Some("help_help_"),
            _ => None,
        }
    }

    fn has_field(self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        EntityType::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| format!("unknown item type {s:?} (expected info, leisure, help, link or service)"))
    }
}

// ── Raw rows ──

/// One CSV record keyed by the entity type's field names.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<&'static str, String>,
}

impl RawRow {
    /// Pair values with `schema` by position. Short records leave trailing fields absent.
    pub fn from_record<'a, I>(schema: &'static [&'static str], record: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields = schema
            .iter()
            .copied()
            .zip(record.into_iter().map(str::to_string))
            .collect();
        RawRow { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

// ── Items ──

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub name: Option<String>,
    pub address: Option<String>,
    pub web_link: Option<String>,
    pub place_id: Option<String>,
    pub icon_uri: String,
    pub is_free: bool,
    pub coordinates: Option<Coordinates>,
    pub phone: Option<String>,
    pub call_for_appointment: bool,
    pub category_code: String,
    pub languages: Vec<&'static str>,
}

/// Resolves a category label to its code for one item type.
pub trait CategoryLookup {
    /// Exactly one category must match `name` (already trimmed).
    fn category_for(&self, item_type: EntityType, name: &str) -> Result<String, LoadError>;
}

const LANGUAGES: [(&str, &str); 3] = [("greek", "el"), ("english", "en"), ("", "en")];

/// Code for a single language name. Blank means English.
pub fn language_for(name: &str) -> Result<&'static str, ParseError> {
    let name = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| *code)
        .ok_or(ParseError::UnknownLanguage(name))
}

/// Codes for a comma separated language field, in the order written.
pub fn languages_for(value: &str) -> Result<Vec<&'static str>, ParseError> {
    value.split(',').map(language_for).collect()
}

pub fn is_free(value: &str) -> bool {
    value.eq_ignore_ascii_case("free")
}

/// `lat,lon` in decimal degrees. Anything else is logged and dropped.
pub fn coordinates_for(value: &str) -> Option<Coordinates> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parts: Vec<&str> = value.split(',').collect();
    if let [lat, lon] = parts.as_slice() {
        if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
            return Some(Coordinates { lat, lon });
        }
    }
    warn!(coordinates = value, "coordinates not parsed");
    None
}

/// Build the item for one row. Fields outside the entity's schema come out absent.
pub fn build_item<C>(item_type: EntityType, row: &RawRow, categories: &C) -> Result<Item, LoadError>
where
    C: CategoryLookup + ?Sized,
{
    let field = |name: &str| {
        if item_type.has_field(name) {
            row.get(name)
        } else {
            None
        }
    };

    let category_code = if item_type.has_field("category") {
        categories.category_for(item_type, field("category").unwrap_or_default().trim())?
    } else {
        item_type
            .default_category()
            .map(str::to_string)
            .ok_or(LoadError::MissingCategory(item_type))?
    };

    let appointment = field("hours").and_then(appointment_for);
    let languages = match field("language") {
        Some(value) => languages_for(value)?,
        None => Vec::new(),
    };

    Ok(Item {
        name: field("name").map(str::to_string),
        address: field("address").map(str::to_string),
        web_link: field("web_link").map(str::to_string),
        place_id: None,
        icon_uri: String::new(),
        is_free: field("free").map(is_free).unwrap_or(false),
        coordinates: field("coordinates").and_then(coordinates_for),
        call_for_appointment: appointment.is_some(),
        phone: appointment.and_then(|a| a.phone),
        category_code,
        languages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory category table: (item type, name) -> codes.
    struct Categories(Vec<(EntityType, &'static str, &'static str)>);

    impl CategoryLookup for Categories {
        fn category_for(&self, item_type: EntityType, name: &str) -> Result<String, LoadError> {
            let matches: Vec<&str> = self
                .0
                .iter()
                .filter(|(t, n, _)| *t == item_type && *n == name)
                .map(|(_, _, code)| *code)
                .collect();
            match matches.as_slice() {
                [code] => Ok(code.to_string()),
                [] => Err(LoadError::CategoryNotFound {
                    item_type,
                    name: name.to_string(),
                }),
                _ => Err(LoadError::AmbiguousCategory {
                    item_type,
                    name: name.to_string(),
                    matches: matches.len(),
                }),
            }
        }
    }

    fn categories() -> Categories {
        Categories(vec![
            (EntityType::Leisure, "Museums", "leisure_museums"),
            (EntityType::Info, "Legal", "info_legal"),
        ])
    }

    fn leisure_row(values: &[&str]) -> RawRow {
        RawRow::from_record(EntityType::Leisure.fields(), values.iter().copied())
    }

    #[test]
    fn languages() {
        assert_eq!(language_for("").unwrap(), "en");
        assert_eq!(language_for("GREEK").unwrap(), "el");
        assert_eq!(language_for(" English ").unwrap(), "en");
        assert_eq!(
            language_for("french"),
            Err(ParseError::UnknownLanguage("french".into()))
        );
    }

    #[test]
    fn language_lists() {
        assert_eq!(languages_for("Greek, English").unwrap(), vec!["el", "en"]);
        assert_eq!(languages_for("").unwrap(), vec!["en"]);
        assert!(languages_for("greek,arabic").is_err());
    }

    #[test]
    fn free_flag() {
        assert!(is_free("FREE"));
        assert!(is_free("free"));
        assert!(!is_free("free entry"));
        assert!(!is_free("5 euro"));
    }

    #[test]
    fn coordinates() {
        assert_eq!(
            coordinates_for("37.9838, 23.7275"),
            Some(Coordinates {
                lat: 37.9838,
                lon: 23.7275
            })
        );
        assert_eq!(coordinates_for("40.1"), None);
        assert_eq!(coordinates_for("1,2,3"), None);
        assert_eq!(coordinates_for("north,east"), None);
        assert_eq!(coordinates_for(""), None);
    }

    #[test]
    fn entity_types_parse() {
        assert_eq!("Leisure".parse::<EntityType>().unwrap(), EntityType::Leisure);
        assert_eq!(" help ".parse::<EntityType>().unwrap(), EntityType::Help);
        assert!("venue".parse::<EntityType>().is_err());
    }

    #[test]
    fn short_records_leave_fields_absent() {
        let row = leisure_row(&["Museums", "Acropolis Museum"]);
        assert_eq!(row.get("name"), Some("Acropolis Museum"));
        assert_eq!(row.get("hours"), None);
    }

    #[test]
    fn builds_full_item() {
        let row = leisure_row(&[
            " Museums ",
            "Acropolis Museum",
            "Dionysiou Areopagitou 15",
            "https://www.theacropolismuseum.gr",
            "Monday-Sunday 8am-8pm",
            "Greek,English",
            "Free",
            "37.9684,23.7286",
        ]);
        let item = build_item(EntityType::Leisure, &row, &categories()).unwrap();
        assert_eq!(item.category_code, "leisure_museums");
        assert_eq!(item.name.as_deref(), Some("Acropolis Museum"));
        assert_eq!(item.address.as_deref(), Some("Dionysiou Areopagitou 15"));
        assert!(item.is_free);
        assert_eq!(item.coordinates.map(|c| c.lat), Some(37.9684));
        assert_eq!(item.languages, vec!["el", "en"]);
        assert!(!item.call_for_appointment);
        assert_eq!(item.phone, None);
        assert_eq!(item.place_id, None);
        assert_eq!(item.icon_uri, "");
    }

    #[test]
    fn appointment_sets_phone_and_flag() {
        let row = leisure_row(&[
            "Museums", "Private collection", "", "", "Appointment (2101234567)", "", "", "",
        ]);
        let item = build_item(EntityType::Leisure, &row, &categories()).unwrap();
        assert!(item.call_for_appointment);
        assert_eq!(item.phone.as_deref(), Some("2101234567"));
        assert!(!item.is_free);
    }

    #[test]
    fn malformed_coordinates_do_not_abort() {
        let row = leisure_row(&["Museums", "Gallery", "", "", "", "", "", "40.1"]);
        let item = build_item(EntityType::Leisure, &row, &categories()).unwrap();
        assert_eq!(item.coordinates, None);
    }

    #[test]
    fn help_rows_use_default_category() {
        let row = RawRow::from_record(
            EntityType::Help.fields(),
            ["Helpline", "https://help.example", "x", "y", "z", "", "", "english", "free"],
        );
        let item = build_item(EntityType::Help, &row, &categories()).unwrap();
        assert_eq!(item.category_code, "help_help_");
        assert_eq!(item.languages, vec!["en"]);
        assert_eq!(item.address, None);
        assert_eq!(item.coordinates, None);
        assert!(!item.call_for_appointment);
    }

    #[test]
    fn unknown_category_is_fatal() {
        let row = leisure_row(&["Cinemas", "Odeon"]);
        let err = build_item(EntityType::Leisure, &row, &categories()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::CategoryNotFound { item_type: EntityType::Leisure, ref name } if name == "Cinemas"
        ));
    }

    #[test]
    fn ambiguous_category_is_fatal() {
        let lookup = Categories(vec![
            (EntityType::Leisure, "Parks", "a"),
            (EntityType::Leisure, "Parks", "b"),
        ]);
        let row = leisure_row(&["Parks", "National Garden"]);
        let err = build_item(EntityType::Leisure, &row, &lookup).unwrap_err();
        assert!(matches!(err, LoadError::AmbiguousCategory { matches: 2, .. }));
    }

    #[test]
    fn unknown_language_is_fatal() {
        let row = leisure_row(&["Museums", "Louvre", "", "", "", "French"]);
        let err = build_item(EntityType::Leisure, &row, &categories()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(ParseError::UnknownLanguage(_))));
    }
}
