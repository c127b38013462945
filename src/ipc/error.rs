use crate::error::Error;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// A failed request, before it is bound to a request id.
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        json!({
            "id": id,
            "ok": false,
            "error": body,
        })
    }
}

impl From<Error> for HandlerErr {
    fn from(e: Error) -> Self {
        let message = e.to_string();
        match e {
            Error::ConstraintViolation { kind, .. } => Self {
                code: "constraint_violation",
                message,
                details: Some(json!({ "kind": kind.as_str() })),
            },
            Error::NotFound { entity, id } => Self {
                code: "not_found",
                message,
                details: Some(json!({ "entity": entity, "id": id })),
            },
            Error::InvalidInput(_) => Self::bad_params(message),
            Error::Database(_) | Error::Json(_) => Self::new("db_query_failed", message),
        }
    }
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}
