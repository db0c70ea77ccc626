use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use bookstore_http::AppError;
use serde_json::{Map, Value};

/// Raw write payload for a book, before field validation.
///
/// Accepts a JSON object or an urlencoded form. An empty body yields an empty
/// object so that the service can still answer 404 for unknown ids.
#[derive(Debug)]
pub struct BookPayload(pub Map<String, Value>);

impl<S> FromRequest<S> for BookPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            return Ok(Self(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            ));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Map::new()));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(AppError::bad_request(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                kind(&other)
            ))),
            Err(e) => Err(AppError::bad_request(format!("JSON parse error - {e}"))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<BookPayload, AppError> {
        let mut builder = Request::post("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        BookPayload::from_request(builder.body(Body::from(body)).unwrap(), &()).await
    }

    #[tokio::test]
    async fn json_object_is_accepted() {
        let BookPayload(map) = extract(Some("application/json"), r#"{"title":"Dune","price":9.99}"#)
            .await
            .unwrap();
        assert_eq!(map["title"], "Dune");
        assert_eq!(map["price"], 9.99);
    }

    #[tokio::test]
    async fn form_fields_become_strings() {
        let BookPayload(map) = extract(
            Some("application/x-www-form-urlencoded"),
            "title=Test+Book&author=Test%20Author&price=9.99",
        )
        .await
        .unwrap();
        assert_eq!(map["title"], "Test Book");
        assert_eq!(map["author"], "Test Author");
        assert_eq!(map["price"], "9.99");
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_object() {
        let BookPayload(map) = extract(None, "").await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_non_object_bodies_are_rejected() {
        let err = extract(Some("application/json"), "{not json").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = extract(Some("application/json"), "[1, 2]").await.unwrap_err();
        assert!(err.to_string().contains("got list"));
    }
}
