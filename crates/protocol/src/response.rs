use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::literal::{parse_literal, DecodeError, Literal};

/// Decoded reply from the build-number command.
///
/// Either field may be missing. A truthy `error` always wins over
/// `next_build_num`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildNumResponse {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub next_build_num: Option<Value>,
}

/// Build number assigned by the server, kept as the digits to splice into
/// the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNumber(String);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResponseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("response is not a mapping: {0}")]
    NotAMapping(String),

    #[error("server error getting next version num: {0}")]
    Server(String),

    #[error("no next build num provided")]
    MissingBuildNumber,

    #[error("invalid next build num: {0}")]
    InvalidBuildNumber(String),
}

impl BuildNumResponse {
    /// Decodes a raw reply body.
    pub fn from_text(body: &str) -> Result<Self, ResponseError> {
        let value = parse_literal(body)?.into_json();
        if !value.is_object() {
            return Err(ResponseError::NotAMapping(value.to_string()));
        }
        serde_json::from_value(value).map_err(|e| ResponseError::NotAMapping(e.to_string()))
    }

    /// Resolves the reply into the assigned build number.
    pub fn into_build_number(self) -> Result<BuildNumber, ResponseError> {
        if let Some(error) = self.error.filter(is_truthy) {
            return Err(ResponseError::Server(display_value(&error)));
        }

        let value = self
            .next_build_num
            .filter(is_truthy)
            .ok_or(ResponseError::MissingBuildNumber)?;

        BuildNumber::from_value(&value)
    }
}

impl BuildNumber {
    fn from_value(value: &Value) -> Result<Self, ResponseError> {
        match value {
            Value::Number(n) if n.is_u64() => Ok(Self(n.to_string())),
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(Self(s.clone()))
            }
            other => Err(ResponseError::InvalidBuildNumber(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Literal truthiness: `None`, `False`, zero, empty strings and empty
/// containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Strings as-is, anything else in its literal form.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => Literal::from(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_text_reads_both_fields() {
        let response = BuildNumResponse::from_text("{'next_build_num': 42, 'error': ''}").unwrap();
        assert_eq!(response.next_build_num, Some(json!(42)));
        assert_eq!(response.error, Some(json!("")));
    }

    #[test]
    fn test_from_text_ignores_unknown_keys() {
        let response =
            BuildNumResponse::from_text("{'next_build_num': '7', 'product': 'app'}").unwrap();
        assert_eq!(response.next_build_num, Some(json!("7")));
        assert_eq!(response.error, None);
    }

    #[test]
    fn test_from_text_rejects_non_mapping() {
        let err = BuildNumResponse::from_text("[42]").unwrap_err();
        assert!(matches!(err, ResponseError::NotAMapping(_)));
    }

    #[test]
    fn test_from_text_passes_decode_errors_through() {
        let err = BuildNumResponse::from_text("next_build_num").unwrap_err();
        assert_eq!(err, ResponseError::Decode(DecodeError::IllegalValue));
    }

    #[test]
    fn test_build_number_from_integer() {
        let response = BuildNumResponse::from_text("{'next_build_num': 42}").unwrap();
        assert_eq!(response.into_build_number().unwrap().as_str(), "42");
    }

    #[test]
    fn test_build_number_from_digit_string() {
        let response = BuildNumResponse::from_text("{'next_build_num': '0042'}").unwrap();
        assert_eq!(response.into_build_number().unwrap().to_string(), "0042");
    }

    #[test]
    fn test_truthy_error_wins() {
        let response =
            BuildNumResponse::from_text("{'error': 'boom', 'next_build_num': 42}").unwrap();
        let err = response.into_build_number().unwrap_err();
        assert_eq!(err, ResponseError::Server("boom".to_string()));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_non_string_error_is_shown_as_literal() {
        for (body, shown) in [
            ("{'error': True}", "True"),
            ("{'error': [1, None]}", "[1, None]"),
            ("{'error': {'code': 'E1'}}", "{'code': 'E1'}"),
            ("{'error': 2.5}", "2.5"),
        ] {
            let response = BuildNumResponse::from_text(body).unwrap();
            assert_eq!(
                response.into_build_number().unwrap_err(),
                ResponseError::Server(shown.to_string()),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_falsy_error_is_ignored() {
        for body in [
            "{'error': None, 'next_build_num': 5}",
            "{'error': '', 'next_build_num': 5}",
            "{'error': 0, 'next_build_num': 5}",
        ] {
            let response = BuildNumResponse::from_text(body).unwrap();
            assert_eq!(response.into_build_number().unwrap().as_str(), "5", "{}", body);
        }
    }

    #[test]
    fn test_missing_build_number() {
        let response = BuildNumResponse::from_text("{}").unwrap();
        assert_eq!(
            response.into_build_number().unwrap_err(),
            ResponseError::MissingBuildNumber
        );
    }

    #[test]
    fn test_zero_build_number_counts_as_missing() {
        let response = BuildNumResponse::from_text("{'next_build_num': 0}").unwrap();
        assert_eq!(
            response.into_build_number().unwrap_err(),
            ResponseError::MissingBuildNumber
        );
    }

    #[test]
    fn test_invalid_build_numbers() {
        for body in [
            "{'next_build_num': -3}",
            "{'next_build_num': 2.5}",
            "{'next_build_num': 'abc'}",
            "{'next_build_num': [1]}",
            "{'next_build_num': True}",
        ] {
            let response = BuildNumResponse::from_text(body).unwrap();
            assert!(
                matches!(
                    response.into_build_number(),
                    Err(ResponseError::InvalidBuildNumber(_))
                ),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([0])));
        assert!(is_truthy(&json!({"a": null})));
    }
}
