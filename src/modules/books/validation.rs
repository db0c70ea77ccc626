//! Field validation for book writes.
//!
//! Payloads arrive as loosely typed JSON objects so that missing fields, nulls
//! and wrongly typed values can each be reported per field instead of failing
//! deserialization as a whole.

use serde_json::{json, Map, Value};

use super::entity;
use super::models::{Price, PriceError};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const DUPLICATE_TITLE: &str = "book with this title already exists.";

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field errors found in one payload, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|error| error.field == field)
            .map(|error| error.message.as_str())
            .collect()
    }

    /// Render as `{"field", "error"}` objects for the error envelope.
    pub fn into_details(self) -> Vec<Value> {
        self.0
            .into_iter()
            .map(|error| json!({ "field": error.field, "error": error.message }))
            .collect()
    }
}

struct TextRule {
    field: &'static str,
    max_chars: usize,
    allow_blank: bool,
}

const TITLE: TextRule = TextRule {
    field: "title",
    max_chars: 128,
    allow_blank: false,
};
const AUTHOR: TextRule = TextRule {
    field: "author",
    max_chars: 64,
    allow_blank: false,
};
const GENRE: TextRule = TextRule {
    field: "genre",
    max_chars: 32,
    allow_blank: true,
};

/// Validated field values for a book write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price: Price,
}

impl From<&entity::Model> for BookDraft {
    fn from(model: &entity::Model) -> Self {
        Self {
            title: model.title.clone(),
            author: model.author.clone(),
            genre: model.genre.clone(),
            price: Price::from_cents(model.price_cents),
        }
    }
}

impl BookDraft {
    /// Validate a full payload: title, author and price are required, a
    /// missing genre becomes empty.
    pub fn full(payload: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        Self::build(payload, None)
    }

    /// Validate a partial payload: fields that are absent keep the values of
    /// `current`.
    pub fn partial(
        payload: &Map<String, Value>,
        current: &BookDraft,
    ) -> Result<Self, ValidationErrors> {
        Self::build(payload, Some(current))
    }

    fn build(
        payload: &Map<String, Value>,
        current: Option<&BookDraft>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = text_field(payload, &TITLE, current.map(|c| c.title.as_str()), &mut errors);
        let author = text_field(payload, &AUTHOR, current.map(|c| c.author.as_str()), &mut errors);
        let genre = text_field(
            payload,
            &GENRE,
            Some(current.map_or("", |c| c.genre.as_str())),
            &mut errors,
        );
        let price = price_field(payload, current.map(|c| c.price), &mut errors);

        match (title, author, genre, price) {
            (Some(title), Some(author), Some(genre), Some(price)) if errors.is_empty() => {
                Ok(Self {
                    title,
                    author,
                    genre,
                    price,
                })
            }
            _ => Err(errors),
        }
    }
}

fn text_field(
    payload: &Map<String, Value>,
    rule: &TextRule,
    fallback: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = match payload.get(rule.field) {
        Some(value) => value,
        None => {
            return match fallback {
                Some(fallback) => Some(fallback.to_string()),
                None => {
                    errors.push(rule.field, REQUIRED);
                    None
                }
            }
        }
    };

    match text_value(value, rule) {
        Ok(text) => Some(text),
        Err(message) => {
            errors.push(rule.field, message);
            None
        }
    }
}

fn text_value(value: &Value, rule: &TextRule) -> Result<String, String> {
    let text = match value {
        Value::Null => return Err(NOT_NULL.to_string()),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(NOT_A_STRING.to_string())
        }
    };

    if text.is_empty() && !rule.allow_blank {
        return Err(NOT_BLANK.to_string());
    }

    if text.chars().count() > rule.max_chars {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            rule.max_chars
        ));
    }

    Ok(text)
}

fn price_field(
    payload: &Map<String, Value>,
    fallback: Option<Price>,
    errors: &mut ValidationErrors,
) -> Option<Price> {
    let parsed = match payload.get("price") {
        None => match fallback {
            Some(price) => return Some(price),
            None => Err(REQUIRED.to_string()),
        },
        Some(Value::Null) => Err(NOT_NULL.to_string()),
        Some(Value::String(s)) => s.parse::<Price>().map_err(|e| e.to_string()),
        Some(Value::Number(n)) => n.to_string().parse::<Price>().map_err(|e| e.to_string()),
        Some(_) => Err(PriceError::Invalid.to_string()),
    };

    match parsed {
        Ok(price) => Some(price),
        Err(message) => {
            errors.push("price", message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn sample() -> Map<String, Value> {
        payload(json!({
            "title": "Test Book",
            "author": "Test Author",
            "genre": "Test Genre",
            "price": 9.99
        }))
    }

    #[test]
    fn accepts_complete_payload() {
        let draft = BookDraft::full(&sample()).unwrap();
        assert_eq!(draft.title, "Test Book");
        assert_eq!(draft.author, "Test Author");
        assert_eq!(draft.genre, "Test Genre");
        assert_eq!(draft.price, Price::from_cents(999));
    }

    #[test]
    fn missing_genre_defaults_to_empty() {
        let mut data = sample();
        data.remove("genre");
        assert_eq!(BookDraft::full(&data).unwrap().genre, "");
    }

    #[test]
    fn missing_required_fields_are_each_reported() {
        let errors = BookDraft::full(&Map::new()).unwrap_err();
        assert_eq!(errors.messages_for("title"), vec![REQUIRED]);
        assert_eq!(errors.messages_for("author"), vec![REQUIRED]);
        assert_eq!(errors.messages_for("price"), vec![REQUIRED]);
        assert!(errors.messages_for("genre").is_empty());
    }

    #[test]
    fn blank_and_null_text_are_rejected() {
        let mut data = sample();
        data.insert("title".into(), json!("   "));
        data.insert("author".into(), Value::Null);
        data.insert("genre".into(), json!(["fiction"]));

        let errors = BookDraft::full(&data).unwrap_err();
        assert_eq!(errors.messages_for("title"), vec![NOT_BLANK]);
        assert_eq!(errors.messages_for("author"), vec![NOT_NULL]);
        assert_eq!(errors.messages_for("genre"), vec![NOT_A_STRING]);
    }

    #[test]
    fn text_is_trimmed_and_length_checked() {
        let mut data = sample();
        data.insert("title".into(), json!("  Dune  "));
        assert_eq!(BookDraft::full(&data).unwrap().title, "Dune");

        data.insert("genre".into(), json!("g".repeat(33)));
        let errors = BookDraft::full(&data).unwrap_err();
        assert_eq!(
            errors.messages_for("genre"),
            vec!["Ensure this field has no more than 32 characters."]
        );
    }

    #[test]
    fn numeric_text_is_stringified() {
        let mut data = sample();
        data.insert("title".into(), json!(1984));
        assert_eq!(BookDraft::full(&data).unwrap().title, "1984");
    }

    #[test]
    fn price_constraints() {
        let cases = [
            (json!(-10), "Ensure this value is greater than or equal to 0."),
            (
                json!(10000),
                "Ensure that there are no more than 4 digits before the decimal point.",
            ),
            (json!("Not Integer"), "A valid number is required."),
            (json!(true), "A valid number is required."),
            (json!(1.234), "Ensure that there are no more than 2 decimal places."),
        ];

        for (price, expected) in cases {
            let mut data = sample();
            data.insert("price".into(), price.clone());
            let errors = BookDraft::full(&data).unwrap_err();
            assert_eq!(errors.messages_for("price"), vec![expected], "{price}");
        }
    }

    #[test]
    fn price_accepts_numeric_strings() {
        let mut data = sample();
        data.insert("price".into(), json!("14.99"));
        assert_eq!(BookDraft::full(&data).unwrap().price, Price::from_cents(1499));
    }

    #[test]
    fn partial_keeps_current_values() {
        let current = BookDraft::full(&sample()).unwrap();
        let data = payload(json!({ "price": "20.00" }));

        let draft = BookDraft::partial(&data, &current).unwrap();
        assert_eq!(draft.title, current.title);
        assert_eq!(draft.genre, current.genre);
        assert_eq!(draft.price, Price::from_cents(2000));
    }

    #[test]
    fn partial_still_validates_supplied_fields() {
        let current = BookDraft::full(&sample()).unwrap();
        let data = payload(json!({ "author": "" }));

        let errors = BookDraft::partial(&data, &current).unwrap_err();
        assert_eq!(errors.messages_for("author"), vec![NOT_BLANK]);
    }

    #[test]
    fn details_use_field_error_shape() {
        let details = ValidationErrors::single("title", DUPLICATE_TITLE).into_details();
        assert_eq!(
            details,
            vec![json!({ "field": "title", "error": DUPLICATE_TITLE })]
        );
    }
}
