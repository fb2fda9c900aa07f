use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One row of the password listing.
///
/// Field values stay opaque JSON values so that whatever the backend sends can
/// be rendered without validation. Missing fields decode as `null` and render
/// as empty cells.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PasswordRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub service_name: Value,
    #[serde(default)]
    pub password_text: Value,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON array of records, got {found}")]
    NotAnArray { found: &'static str },

    #[error("record {index} is null")]
    NullRecord { index: usize },
}

impl PasswordRecord {
    pub fn new(id: u64, service_name: &str, password_text: &str) -> Self {
        Self {
            id: Value::from(id),
            service_name: Value::from(service_name),
            password_text: Value::from(password_text),
        }
    }

    /// Builds a record from one element of the decoded array. A non-object
    /// element has none of the three fields, so every cell is empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                id: fields.remove("id").unwrap_or(Value::Null),
                service_name: fields.remove("service_name").unwrap_or(Value::Null),
                password_text: fields.remove("password_text").unwrap_or(Value::Null),
            },
            _ => Self::default(),
        }
    }

    /// Cell texts in column order: id, service, password.
    pub fn cells(&self) -> [String; 3] {
        [
            cell_text(&self.id),
            cell_text(&self.service_name),
            cell_text(&self.password_text),
        ]
    }
}

/// Text a field value shows as in a table cell.
///
/// Follows the string conversion a DOM text assignment applies: `null` is
/// empty, numbers use the shortest round-trip form, arrays join their
/// elements with commas and objects collapse to `[object Object]`.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => value_text(other),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(number_text)
            .unwrap_or_else(|| n.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Formats a number the way script engines print one: plain digits for
/// magnitudes in `[1e-6, 1e21)`, exponent form (`1e+21`, `1.5e-7`) outside.
pub fn number_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if !n.is_finite() {
        return if n.is_nan() {
            "NaN".to_string()
        } else if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e3".
    let sci = format!("{:e}", n.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let frac = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        format!("{first}{frac}e{sign}{}", (point - 1).abs())
    };

    if n < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a response body as JSON without looking at its shape.
pub fn parse_body(body: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(body).map_err(|source| DecodeError::InvalidJson { source })
}

/// Turns a parsed body into records, preserving array order.
///
/// The body must be an array and no element may be `null`. Other non-object
/// elements become rows of empty cells.
pub fn records_from_value(value: Value) -> Result<Vec<PasswordRecord>, DecodeError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::NotAnArray {
                found: kind_name(&other),
            })
        }
    };
    if let Some(index) = items.iter().position(Value::is_null) {
        return Err(DecodeError::NullRecord { index });
    }
    Ok(items.into_iter().map(PasswordRecord::from_value).collect())
}

pub fn decode_records(body: &[u8]) -> Result<Vec<PasswordRecord>, DecodeError> {
    records_from_value(parse_body(body)?)
}
