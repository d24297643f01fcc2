//! Resource handlers. Each one performs a single store operation after the route's gate
//! has passed and returns the operation's result as-is.

use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    error::ApiError,
    repository::{Document, ID_FIELD, document, is_document_id},
};

pub mod blogs;
pub mod dashboard;
pub mod donations;
pub mod funds;
pub mod payments;
pub mod users;

/// Serializes a typed payload into a document, dropping `None` fields.
pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, ApiError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut doc)) => {
            doc.retain(|_, v| !v.is_null());
            Ok(doc)
        }
        Ok(other) => Err(ApiError::Upstream(format!(
            "payload did not serialize to an object: {other}"
        ))),
        Err(e) => Err(ApiError::Upstream(e.to_string())),
    }
}

/// Validates a path id and returns the matching `_id` filter.
pub(crate) fn id_filter(id: &str) -> Result<Document, ApiError> {
    if !is_document_id(id) {
        return Err(ApiError::validation(format!("'{id}' is not a valid id")));
    }
    Ok(document(json!({ ID_FIELD: id })))
}

/// Rejects an update that would write nothing.
pub(crate) fn non_empty(set: Document) -> Result<Document, ApiError> {
    if set.is_empty() {
        Err(ApiError::validation("no fields to update"))
    } else {
        Ok(set)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
