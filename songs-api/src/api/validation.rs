//! Request validation
//!
//! Bodies go through `ValidatedJson`: not JSON -> 400, schema mismatch or
//! field rule violation -> 422 with a list of field errors. Query strings
//! are read leniently and checked here so bad values map to the same shapes.

use crate::error::{ApiError, FieldError};
use crate::pagination::{PageRequest, DEFAULT_PAGE_SIZE};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Field-level rules checked after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// JSON body that deserialized and passed `Validate`
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::BadRequest("Request body must be JSON".to_string()))?;

        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|_| ApiError::BadRequest("Request body must be JSON".to_string()))?;
        if !value.is_object() {
            return Err(ApiError::BadRequest("Request body must be JSON".to_string()));
        }

        let parsed: T = serde_json::from_value(value).map_err(|e| {
            let message = e.to_string();
            ApiError::Validation(vec![FieldError::new(field_from_serde_message(&message), message)])
        })?;

        parsed.validate().map_err(ApiError::Validation)?;
        Ok(ValidatedJson(parsed))
    }
}

/// Pull the field name out of serde messages like "missing field `rating`"
fn field_from_serde_message(message: &str) -> String {
    message
        .split('`')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("body")
        .to_string()
}

/// Read `page` / `page_size` from query parameters
pub fn page_request(
    params: &HashMap<String, String>,
    max_page_size: i64,
) -> Result<PageRequest, ApiError> {
    let mut errors = Vec::new();

    let page = match parse_int_param(params, "page", 1) {
        Ok(p) if p >= 1 => p,
        Ok(_) => {
            errors.push(FieldError::new("page", "Input should be greater than or equal to 1"));
            1
        }
        Err(e) => {
            errors.push(e);
            1
        }
    };

    let page_size = match parse_int_param(params, "page_size", DEFAULT_PAGE_SIZE) {
        Ok(s) if (1..=max_page_size).contains(&s) => s,
        Ok(_) => {
            errors.push(FieldError::new(
                "page_size",
                format!("Input should be between 1 and {}", max_page_size),
            ));
            DEFAULT_PAGE_SIZE
        }
        Err(e) => {
            errors.push(e);
            DEFAULT_PAGE_SIZE
        }
    };

    if errors.is_empty() {
        Ok(PageRequest { page, page_size })
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn parse_int_param(
    params: &HashMap<String, String>,
    name: &str,
    default: i64,
) -> Result<i64, FieldError> {
    match params.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| FieldError::new(name, "Input should be a valid integer")),
    }
}

/// Required non-blank `message` parameter of the search route
pub fn search_message(params: &HashMap<String, String>) -> Result<String, ApiError> {
    match params.get("message") {
        Some(m) if !m.trim().is_empty() => Ok(m.clone()),
        _ => Err(ApiError::BadRequest(
            "Query parameter 'message' is required".to_string(),
        )),
    }
}

/// Optional integer `level`; blank counts as absent
pub fn level_filter(params: &HashMap<String, String>) -> Result<Option<i64>, ApiError> {
    match params.get("level").map(|l| l.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest("Invalid integer for 'level'".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_page_defaults() {
        let page = page_request(&params(&[]), 100).unwrap();
        assert_eq!(page, PageRequest { page: 1, page_size: 20 });
    }

    #[test]
    fn test_page_size_over_max_rejected() {
        let err = page_request(&params(&[("page_size", "101")]), 100).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e[0].field == "page_size"));
    }

    #[test]
    fn test_page_zero_and_non_integer_both_reported() {
        let err = page_request(&params(&[("page", "0"), ("page_size", "abc")]), 100).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_search_message_required() {
        assert!(search_message(&params(&[])).is_err());
        assert!(search_message(&params(&[("message", "  ")])).is_err());
        assert_eq!(search_message(&params(&[("message", "yousicians")])).unwrap(), "yousicians");
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(&params(&[])).unwrap(), None);
        assert_eq!(level_filter(&params(&[("level", "")])).unwrap(), None);
        assert_eq!(level_filter(&params(&[("level", "13")])).unwrap(), Some(13));
        assert!(matches!(
            level_filter(&params(&[("level", "abc")])),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_field_from_serde_message() {
        assert_eq!(field_from_serde_message("missing field `rating`"), "rating");
        assert_eq!(field_from_serde_message("expected value"), "body");
    }
}
