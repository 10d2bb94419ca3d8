//! Core record types for restaurant-knowledge.
//!
//! A [`Record`] is one restaurant entry. The whole collection is stored as a
//! single JSON array, so the serialized shape here *is* the persisted layout.
//! Records written before `author` and `rating` existed are still accepted;
//! missing fields are filled with their defaults on read. Fields this
//! version does not know about are kept and written back unchanged.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Author stored when a record is submitted without one.
pub const ANONYMOUS_AUTHOR: &str = "anonymous";

/// JSON names of the fields every create/update request must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "category", "nearestStation", "address"];

/// One restaurant entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Timestamp-derived identifier, assigned at creation and never changed.
    /// Stored numbers are read as their decimal text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Shop name.
    pub name: String,

    /// Free-form category ("Izakaya", "Cafe", ...).
    pub category: String,

    /// Nearest train station.
    pub nearest_station: String,

    /// Street address.
    pub address: String,

    /// Budget per person, as entered.
    #[serde(default, deserialize_with = "nullable_string")]
    pub budget: String,

    /// Contact phone number.
    #[serde(default, deserialize_with = "nullable_string")]
    pub phone: String,

    /// The shop's own web page.
    #[serde(default, deserialize_with = "nullable_string")]
    pub shop_url: String,

    /// Free-text comment.
    #[serde(default, deserialize_with = "nullable_string")]
    pub comment: String,

    /// Any other related link (review site, article).
    #[serde(default, deserialize_with = "nullable_string")]
    pub url_link: String,

    /// Who registered the entry.
    #[serde(default = "anonymous", deserialize_with = "author_or_anonymous")]
    pub author: String,

    /// Numeric score; zero when unrated.
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: f64,

    /// When the record was created (millisecond precision, UTC).
    #[serde(default, with = "iso_millis")]
    pub created_at: DateTime<Utc>,

    /// Stored fields not modelled above, passed through on write.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a create or update request.
///
/// Every field is optional at this level; [`RecordInput::validate`] decides
/// whether the required ones are present. Unknown fields (including `id` and
/// `createdAt`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    /// Shop name.
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    /// Category.
    #[serde(default, deserialize_with = "loose_string")]
    pub category: Option<String>,
    /// Nearest station.
    #[serde(default, deserialize_with = "loose_string")]
    pub nearest_station: Option<String>,
    /// Street address.
    #[serde(default, deserialize_with = "loose_string")]
    pub address: Option<String>,
    /// Budget per person.
    #[serde(default, deserialize_with = "loose_string")]
    pub budget: Option<String>,
    /// Phone number.
    #[serde(default, deserialize_with = "loose_string")]
    pub phone: Option<String>,
    /// Shop web page.
    #[serde(default, deserialize_with = "loose_string")]
    pub shop_url: Option<String>,
    /// Free-text comment.
    #[serde(default, deserialize_with = "loose_string")]
    pub comment: Option<String>,
    /// Related link.
    #[serde(default, deserialize_with = "loose_string")]
    pub url_link: Option<String>,
    /// Author; empty means anonymous.
    #[serde(default, deserialize_with = "loose_string")]
    pub author: Option<String>,
    /// Score, coerced to a number.
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: f64,
}

impl RecordInput {
    /// JSON names of the required fields that are absent or empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            &self.name,
            &self.category,
            &self.nearest_station,
            &self.address,
        ];
        REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Check that all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming every missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Record {
    /// Build a record from a validated request body.
    ///
    /// Optional strings default to empty, the author to
    /// [`ANONYMOUS_AUTHOR`]. `created_at` is rounded up to the next whole
    /// millisecond, so the value survives a round trip through the stored
    /// document unchanged and is never earlier than the time passed in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a required field is missing.
    pub fn from_input(id: String, created_at: DateTime<Utc>, input: RecordInput) -> Result<Self> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.unwrap_or_default(),
            category: input.category.unwrap_or_default(),
            nearest_station: input.nearest_station.unwrap_or_default(),
            address: input.address.unwrap_or_default(),
            budget: input.budget.unwrap_or_default(),
            phone: input.phone.unwrap_or_default(),
            shop_url: input.shop_url.unwrap_or_default(),
            comment: input.comment.unwrap_or_default(),
            url_link: input.url_link.unwrap_or_default(),
            author: input
                .author
                .filter(|author| !author.is_empty())
                .unwrap_or_else(anonymous),
            rating: input.rating,
            created_at: ceil_millis(created_at),
            extra: Map::new(),
        })
    }

    /// Replace every field from `input`, keeping `id` and `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a required field is missing.
    pub fn with_changes(&self, input: RecordInput) -> Result<Self> {
        let mut updated = Self::from_input(self.id.clone(), self.created_at, input)?;
        updated.created_at = self.created_at;
        updated.extra.clone_from(&self.extra);
        Ok(updated)
    }

    /// URL used for the thumbnail preview: the shop page, else the extra link.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        [self.shop_url.as_str(), self.url_link.as_str()]
            .into_iter()
            .find(|url| !url.is_empty())
    }
}

/// Generate an id for a new record.
///
/// Ids are the creation time in milliseconds since the epoch. If that value
/// is already taken in `existing`, it is advanced until it is free.
#[must_use]
pub fn next_id(existing: &[Record], now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !existing.iter().any(|record| record.id == id) {
            return id;
        }
        candidate += 1;
    }
}

/// Position of the record with `id`, if any.
#[must_use]
pub fn position(records: &[Record], id: &str) -> Option<usize> {
    records.iter().position(|record| record.id == id)
}

fn ceil_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = at.trunc_subsecs(3);
    if truncated < at {
        truncated + TimeDelta::milliseconds(1)
    } else {
        truncated
    }
}

fn anonymous() -> String {
    ANONYMOUS_AUTHOR.to_string()
}

fn nullable_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn author_or_anonymous<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|author| !author.is_empty())
        .unwrap_or_else(anonymous))
}

/// Accept strings and numbers; `null` counts as absent.
fn loose_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(value_kind(&other)),
            &"a string",
        )),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(value_kind(&other)),
            &"a string or number",
        )),
    }
}

/// Coerce anything to a finite number, falling back to zero.
fn lenient_rating<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let rating = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if rating.is_finite() { rating } else { 0.0 })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// ISO-8601 with millisecond precision, e.g. `2024-05-01T09:30:00.123Z`.
///
/// Reading is lenient: RFC 3339, a zone-less date-time (taken as UTC), a bare
/// date (midnight UTC) or epoch milliseconds. Anything else becomes the epoch
/// rather than making the whole collection unreadable.
mod iso_millis {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use tracing::warn;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let parsed = match Value::deserialize(deserializer)? {
            Value::String(raw) => parse(raw.trim()),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        };
        Ok(parsed.unwrap_or_else(|| {
            warn!("Unreadable createdAt in stored record, using the epoch");
            DateTime::default()
        }))
    }

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(at.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc())
    }
}
