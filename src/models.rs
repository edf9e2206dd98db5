//! API Models
//!
//! Submission records as returned by the upstream forms API, and the bodies
//! this service answers with.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use utoipa::ToSchema;

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
}

/// Filtered and re-paginated page of submissions
///
/// Records are the upstream JSON objects exactly as received.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponsesPage {
    /// Submissions on this page
    #[schema(value_type = Vec<Object>)]
    pub responses: Vec<Value>,
    /// Matching submissions before slicing
    pub total_responses: usize,
    /// Pages of `limit` needed to list every match
    pub page_count: usize,
}

/// Page of submissions as sent by the upstream API.
///
/// Only `responses` is read; the upstream's own totals are recomputed after
/// filtering. Records stay raw so that one odd record cannot fail the page.
#[derive(Debug, Deserialize)]
pub struct SubmissionsPage {
    /// Raw submission records
    pub responses: Vec<Value>,
}

// ============ Submissions ============

/// Read-only view of one form submission.
///
/// Only the answered questions are interpreted. Identifiers, timestamps,
/// calculations, URL parameters, quiz and documents stay opaque in the raw
/// record, which is what gets returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormResponse {
    /// Questions that could be read; malformed entries are left out
    #[serde(default, deserialize_with = "readable_questions")]
    pub questions: Vec<Question>,
}

impl FormResponse {
    /// Decode the view from a raw upstream record.
    pub fn from_raw(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }

    /// Find a question by its id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

// A question without a string id can never be referenced by a clause, so it
// is dropped instead of failing the record.
fn readable_questions<'de, D>(deserializer: D) -> Result<Vec<Question>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().filter_map(|q| Question::deserialize(q).ok()).collect())
}

/// A single answered question within a submission
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    /// Stable question id referenced by filter clauses
    pub id: String,
    /// Type tag; absent or `null` reads as an unrecognized tag
    #[serde(rename = "type", default, deserialize_with = "type_tag")]
    pub field_type: FieldType,
    /// Answer, `None` when unanswered
    #[serde(default)]
    pub value: Option<FieldValue>,
}

fn type_tag<'de, D>(deserializer: D) -> Result<FieldType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(tag) => FieldType::from(tag),
        _ => FieldType::default(),
    })
}

/// Answer value of a question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON number
    Number(Number),
    /// JSON string
    Text(String),
    /// Arrays, objects and booleans. Never comparable to a filter value.
    Other(Value),
}

impl FieldValue {
    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Text value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ============ Field types ============

/// Broad grouping of question types, used to decide how values compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// Free text; equality only
    Text,
    /// Compared numerically
    Numeric,
    /// Selections; equality only
    Choice,
    /// Compared as instants
    DateTime,
    /// Uploads and recordings
    Media,
    /// Structured or widget specific answers
    Special,
    /// Tag not known to this service; never ordered
    Unrecognized,
}

macro_rules! field_types {
    ($($variant:ident => $category:ident),+ $(,)?) => {
        /// Upstream question type tag.
        ///
        /// Tags this service does not know are kept verbatim in `Other`.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum FieldType {
            $(
                #[doc = concat!("`", stringify!($variant), "` question")]
                $variant,
            )+
            /// Unknown tag, or empty when the record carried none
            Other(String),
        }

        impl Default for FieldType {
            fn default() -> Self {
                FieldType::Other(String::new())
            }
        }

        impl FieldType {
            /// Tag as sent by the upstream API
            pub fn as_str(&self) -> &str {
                match self {
                    $(FieldType::$variant => stringify!($variant),)+
                    FieldType::Other(tag) => tag,
                }
            }

            /// Comparison group of this tag
            pub fn category(&self) -> FieldCategory {
                match self {
                    $(FieldType::$variant => FieldCategory::$category,)+
                    FieldType::Other(_) => FieldCategory::Unrecognized,
                }
            }
        }

        impl From<String> for FieldType {
            fn from(tag: String) -> Self {
                match tag.as_str() {
                    $(stringify!($variant) => FieldType::$variant,)+
                    _ => FieldType::Other(tag),
                }
            }
        }
    };
}

field_types! {
    ShortAnswer => Text,
    LongAnswer => Text,
    EmailInput => Text,
    Password => Text,
    URLInput => Text,
    CurrencyInput => Text,
    NumberInput => Numeric,
    Checkbox => Choice,
    Checkboxes => Choice,
    Dropdown => Choice,
    MultiSelect => Choice,
    MultipleChoice => Choice,
    DatePicker => DateTime,
    DateRange => DateTime,
    DateTimePicker => DateTime,
    TimePicker => DateTime,
    AudioRecording => Media,
    FileUpload => Media,
    ImagePicker => Media,
    Address => Special,
    Calcom => Special,
    Calendly => Special,
    Captcha => Special,
    ColorPicker => Special,
    LocationCoordinates => Special,
    Matrix => Special,
    OpinionScale => Special,
    Payment => Special,
    PhoneNumber => Special,
    Ranking => Special,
    RecordPicker => Special,
    Signature => Special,
    Slider => Special,
    StarRating => Special,
    Switch => Special,
}
