use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::services::storage::StorageError;

/// Per-field validation messages keyed by the client's camelCase path
/// (`attendees[2].fullName`).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failure returned by every action. Handlers turn it into the uniform
/// `{ "success": false, ... }` body.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("You must be signed in")]
    Unauthenticated,

    #[error("You are not allowed to perform this action")]
    Unauthorized,

    #[error("This church is already registered for the event")]
    DuplicateRegistration,

    #[error("Registration for this event is closed")]
    EventNotOpen,

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("Batch not found")]
    BatchNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Only pending batches can be edited")]
    BatchNotEditable,

    #[error("Batch has already been reviewed")]
    BatchNotPending,

    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    #[error("{0}")]
    HasDependents(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl ActionError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            message: message.into(),
        }
    }

    /// Maps a unique-index violation to `on_unique`, passing anything else through.
    pub fn from_write(err: DbErr, on_unique: impl FnOnce() -> ActionError) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => on_unique(),
            _ => Self::Database(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ActionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ActionError::Unauthorized => StatusCode::FORBIDDEN,
            ActionError::RegistrationNotFound
            | ActionError::BatchNotFound
            | ActionError::NotFound(_) => StatusCode::NOT_FOUND,
            ActionError::DuplicateRegistration
            | ActionError::EventNotOpen
            | ActionError::BatchNotEditable
            | ActionError::BatchNotPending
            | ActionError::Conflict { .. }
            | ActionError::HasDependents(_) => StatusCode::CONFLICT,
            ActionError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            ActionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ActionError::Storage(_) => StatusCode::BAD_GATEWAY,
            ActionError::Database(_) | ActionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationErrors> for ActionError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        flatten_validation(&errors, "", &mut fields);
        Self::Validation(fields)
    }
}

fn flatten_validation(errors: &ValidationErrors, prefix: &str, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = out.entry(path).or_default();
                for error in list {
                    messages.push(
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("invalid value ({})", error.code)),
                    );
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

fn camel_case(field: &str) -> String {
    if field.starts_with("__") {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Body deserialization failures become field errors. Data errors carry the
/// offending path (`attendees[1].gender: unknown variant ...`); anything else
/// is reported against `body`.
impl From<JsonRejection> for ActionError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        if let JsonRejection::JsonDataError(_) = rejection {
            if let Some((path, message)) = text
                .strip_prefix(JSON_DATA_PREFIX)
                .and_then(|rest| rest.split_once(": "))
                .filter(|(path, _)| !path.contains(' '))
            {
                return Self::field(path, message);
            }
        }
        Self::field("body", text)
    }
}

impl From<QueryRejection> for ActionError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidFilter(rejection.body_text())
    }
}

impl From<PathRejection> for ActionError {
    fn from(rejection: PathRejection) -> Self {
        Self::field("path", rejection.body_text())
    }
}

/// Success envelope shared by every JSON action.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ActionResponse<T>> {
    Json(ActionResponse {
        success: true,
        data,
    })
}

pub type ActionResult<T> = Result<Json<ActionResponse<T>>, ActionError>;

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ActionError::Validation(fields) => {
                json!({ "success": false, "error": self.to_string(), "fields": fields })
            }
            ActionError::Conflict { field, message } => {
                json!({ "success": false, "error": message, "field": field })
            }
            ActionError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                json!({ "success": false, "error": "Something went wrong, please try again" })
            }
            ActionError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                json!({ "success": false, "error": "Something went wrong, please try again" })
            }
            ActionError::Storage(err) => {
                tracing::warn!("Upload failed: {:?}", err);
                json!({ "success": false, "error": "Upload failed, please try again" })
            }
            _ => json!({ "success": false, "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ActionError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Row {
        #[validate(range(min = 1, max = 120, message = "Age must be between 1 and 120"))]
        age: i32,
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "Name is required"))]
        full_name: String,
        #[validate(nested)]
        rows: Vec<Row>,
    }

    #[test]
    fn nested_validation_errors_flatten_to_paths() {
        let form = Form {
            full_name: String::new(),
            rows: vec![Row { age: 30 }, Row { age: 0 }],
        };
        let err: ActionError = form.validate().unwrap_err().into();

        let ActionError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields["fullName"], vec!["Name is required".to_string()]);
        assert!(!fields.contains_key("full_name"));
        assert_eq!(
            fields["rows[1].age"],
            vec!["Age must be between 1 and 120".to_string()]
        );
        assert!(!fields.contains_key("rows[0].age"));
    }

    #[test]
    fn conflicts_and_lookups_map_to_http_statuses() {
        assert_eq!(ActionError::DuplicateRegistration.status(), StatusCode::CONFLICT);
        assert_eq!(ActionError::BatchNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ActionError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ActionError::InvalidFilter("page".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
