//! Book model and request types.
//!
//! Request bodies arrive loosely typed: numbers may be sent as strings and the
//! `reading` flag as a bool, an integer or a string. [`BookPayload`] keeps those
//! scalars as received; [`BookPayload::into_input`] checks the name, coerces the
//! scalars, then checks the page range, producing a [`BookInput`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, NoneAsEmptyString};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Full book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    /// True when the book was fully read at creation time
    pub finished: bool,
    pub reading: bool,
    #[serde(serialize_with = "serialize_timestamp")]
    pub inserted_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// ISO 8601 with millisecond precision, e.g. `2024-01-31T08:15:02.417Z`
fn serialize_timestamp<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Book {
    /// Build a new record; `finished` is derived here and only here.
    pub fn new(id: String, input: BookInput, now: DateTime<Utc>) -> Self {
        Self {
            finished: input.page_count == input.read_page,
            id,
            name: input.name,
            year: input.year,
            author: input.author,
            summary: input.summary,
            publisher: input.publisher,
            page_count: input.page_count,
            read_page: input.read_page,
            reading: input.reading,
            inserted_at: now,
            updated_at: now,
        }
    }

    /// Replace every mutable field. `id`, `inserted_at` and `finished` are kept.
    pub fn apply(&mut self, input: BookInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.year = input.year;
        self.author = input.author;
        self.summary = input.summary;
        self.publisher = input.publisher;
        self.page_count = input.page_count;
        self.read_page = input.read_page;
        self.reading = input.reading;
        self.updated_at = now;
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            name: book.name.clone(),
            publisher: book.publisher.clone(),
        }
    }
}

/// A JSON scalar exactly as the client sent it; coerced only after the name check
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseValue {
    /// Whole number, from an integer, an integral float or a numeric string
    fn as_integer(&self) -> Option<i64> {
        match self {
            LooseValue::Int(n) => Some(*n),
            LooseValue::Float(f) => integral(*f),
            LooseValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Some(0);
                }
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().and_then(integral))
            }
            LooseValue::Bool(_) => None,
        }
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            LooseValue::Bool(value) => Some(*value),
            LooseValue::Int(n) => Some(*n != 0),
            LooseValue::Float(f) => (!f.is_nan()).then(|| *f != 0.0),
            LooseValue::Text(text) => parse_flag(text),
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// Create / update book request body. `null` and absent fields are the same.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    /// Publication year, as a number or a numeric string
    #[schema(value_type = Option<i32>)]
    pub year: Option<LooseValue>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    #[schema(value_type = Option<u32>)]
    pub page_count: Option<LooseValue>,
    #[schema(value_type = Option<u32>)]
    pub read_page: Option<LooseValue>,
    /// Accepts true/false, 1/0 or their string forms
    #[schema(value_type = Option<bool>)]
    pub reading: Option<LooseValue>,
}

/// Checked book fields, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct BookInput {
    pub name: String,
    pub year: i32,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    pub reading: bool,
}

/// Reasons a payload is refused, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookViolation {
    MissingName,
    /// Field (by its wire name) that cannot be coerced
    InvalidValue(&'static str),
    PageOverflow,
}

fn coerce_number<T: TryFrom<i64>>(
    value: Option<&LooseValue>,
    field: &'static str,
) -> Result<T, BookViolation> {
    let number = match value {
        None => 0,
        Some(value) => value.as_integer().ok_or(BookViolation::InvalidValue(field))?,
    };
    T::try_from(number).map_err(|_| BookViolation::InvalidValue(field))
}

impl BookPayload {
    pub fn into_input(self) -> Result<BookInput, BookViolation> {
        // Only `name` carries validation rules.
        if self.validate().is_err() {
            return Err(BookViolation::MissingName);
        }

        let year: i32 = coerce_number(self.year.as_ref(), "year")?;
        let page_count: u32 = coerce_number(self.page_count.as_ref(), "pageCount")?;
        let read_page: u32 = coerce_number(self.read_page.as_ref(), "readPage")?;
        let reading = match &self.reading {
            None => false,
            Some(value) => value
                .as_flag()
                .ok_or(BookViolation::InvalidValue("reading"))?,
        };

        if read_page > page_count {
            return Err(BookViolation::PageOverflow);
        }

        Ok(BookInput {
            name: self.name.unwrap_or_default(),
            year,
            author: self.author,
            summary: self.summary,
            publisher: self.publisher,
            page_count,
            read_page,
            reading,
        })
    }
}

/// Query parameters for listing books
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the book name
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub name: Option<String>,
    /// 1 for books being read, 0 for the others
    #[serde(default, deserialize_with = "deserialize_optional_flag")]
    pub reading: Option<bool>,
    /// 1 for finished books, 0 for the others
    #[serde(default, deserialize_with = "deserialize_optional_flag")]
    pub finished: Option<bool>,
}

impl BookQuery {
    fn name_filter(&self) -> Option<String> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_empty(&self) -> bool {
        self.name_filter().is_none() && self.reading.is_none() && self.finished.is_none()
    }

    /// True when the book satisfies every filter that is set
    pub fn matches(&self, book: &Book) -> bool {
        let name_ok = self
            .name_filter()
            .map_or(true, |needle| book.name.to_lowercase().contains(&needle));
        let reading_ok = self.reading.map_or(true, |reading| book.reading == reading);
        let finished_ok = self.finished.map_or(true, |finished| book.finished == finished);

        name_ok && reading_ok && finished_ok
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n != 0),
    }
}

fn deserialize_optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_flag(text)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean value: {}", text))),
    }
}
