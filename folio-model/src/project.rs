use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::{bool_field, int_field, list_field, str_field};

/// Applied when a record carries no usable `sortOrder`.
pub const DEFAULT_SORT_ORDER: i64 = 100;
pub const DEFAULT_ROLE: &str = "Developer";
pub const DEFAULT_TITLE: &str = "Untitled";

/// One portfolio entry, decoded leniently from a store document.
///
/// Decoding never fails: missing or mistyped fields fall back to the
/// documented defaults so a half-filled document still renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Store-assigned identifier, immutable for the record's lifetime.
    pub id: String,
    pub title: String,
    pub blurb: String,
    pub description: String,
    pub image_url: String,
    pub live_url: String,
    pub github_url: String,
    pub tags: Vec<String>,
    pub stack: Vec<String>,
    pub role: String,
    pub year: i32,
    pub pinned: bool,
    pub sort_order: i64,
    /// Milliseconds since the Unix epoch; set once at creation.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch; refreshed on every write.
    pub updated_at: i64,
}

impl Project {
    pub fn from_fields(id: &str, fields: &Map<String, Value>) -> Self {
        let text = |key: &str| str_field(fields, key).unwrap_or_default();
        Self {
            id: id.to_owned(),
            title: text("title"),
            blurb: text("blurb"),
            description: text("description"),
            image_url: text("imageUrl"),
            live_url: text("liveUrl"),
            github_url: text("githubUrl"),
            tags: list_field(fields, "tags").unwrap_or_default(),
            stack: list_field(fields, "stack").unwrap_or_default(),
            role: str_field(fields, "role")
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_owned()),
            year: int_field(fields, "year")
                .and_then(|y| i32::try_from(y).ok())
                .unwrap_or_else(current_year),
            pinned: bool_field(fields, "pinned").unwrap_or(false),
            sort_order: int_field(fields, "sortOrder")
                .unwrap_or(DEFAULT_SORT_ORDER),
            created_at: int_field(fields, "createdAt").unwrap_or(0),
            updated_at: int_field(fields, "updatedAt").unwrap_or(0),
        }
    }
}

/// Current calendar year in UTC, derived from the system clock.
pub fn current_year() -> i32 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    year_of_epoch_millis(millis)
}

/// Calendar year of a Unix-epoch timestamp (civil-from-days).
pub fn year_of_epoch_millis(millis: i64) -> i32 {
    let days = millis.div_euclid(86_400_000);
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    (y + i64::from(month <= 2)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_from_fields_full_document() {
        let p = Project::from_fields(
            "p1",
            &fields(json!({
                "title": "Folio",
                "blurb": "A portfolio",
                "description": "Long form",
                "imageUrl": "https://img.example/x.png",
                "liveUrl": "https://folio.example",
                "githubUrl": "https://github.com/x/folio",
                "tags": ["web", "rust"],
                "stack": ["Axum"],
                "role": "Lead",
                "year": 2024,
                "pinned": true,
                "sortOrder": 5,
                "createdAt": 1_700_000_000_000i64,
                "updatedAt": 1_700_000_000_001i64,
            })),
        );
        assert_eq!(p.id, "p1");
        assert_eq!(p.title, "Folio");
        assert_eq!(p.tags, vec!["web", "rust"]);
        assert_eq!(p.role, "Lead");
        assert_eq!(p.year, 2024);
        assert!(p.pinned);
        assert_eq!(p.sort_order, 5);
        assert_eq!(p.created_at, 1_700_000_000_000);
    }

    #[test]
    fn test_from_fields_applies_defaults() {
        let p = Project::from_fields("p2", &Map::new());
        assert_eq!(p.title, "");
        assert_eq!(p.role, DEFAULT_ROLE);
        assert_eq!(p.sort_order, DEFAULT_SORT_ORDER);
        assert!(!p.pinned);
        assert_eq!(p.created_at, 0);
        assert_eq!(p.year, current_year());
    }

    #[test]
    fn test_sort_order_non_numeric_defaults_to_100() {
        let p = Project::from_fields(
            "p3",
            &fields(json!({ "sortOrder": "not a number" })),
        );
        assert_eq!(p.sort_order, DEFAULT_SORT_ORDER);
    }

    #[test]
    fn test_year_out_of_i32_range_falls_back() {
        let p = Project::from_fields(
            "p4",
            &fields(json!({ "year": 5_000_000_000i64 })),
        );
        assert_eq!(p.year, current_year());
    }

    #[test]
    fn test_year_of_epoch_millis() {
        assert_eq!(year_of_epoch_millis(0), 1970);
        // 2024-01-01T00:00:00Z
        assert_eq!(year_of_epoch_millis(1_704_067_200_000), 2024);
        // one millisecond before it
        assert_eq!(year_of_epoch_millis(1_704_067_199_999), 2023);
    }
}
