//! Error types for document mutations and the JSON codec.

use crate::id::ElementId;
use crate::model::PlaceholderRole;
use thiserror::Error;

/// A structural violation. The document is left unchanged when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("an element with role {0} already exists")]
    DuplicateRole(PlaceholderRole),

    #[error("element id `{0}` is already in use")]
    DuplicateId(ElementId),

    #[error("roles may only be assigned to top-level elements (found {0} inside a group)")]
    NestedRole(PlaceholderRole),

    #[error("the {0} placeholder cannot be deleted")]
    CannotRemovePlaceholder(PlaceholderRole),

    #[error("the {0} placeholder cannot be duplicated")]
    CannotDuplicatePlaceholder(PlaceholderRole),

    #[error("the role of the {0} placeholder cannot be changed")]
    RoleChangeForbidden(PlaceholderRole),

    #[error("no element with id `{0}`")]
    UnknownElement(ElementId),

    #[error("{field} of `{id}` must be a finite number")]
    NonFinite { id: ElementId, field: &'static str },

    #[error("canvas size must be positive (got {width}x{height})")]
    InvalidCanvasSize { width: u32, height: u32 },
}

/// A failure that prevents a document from being decoded at all.
///
/// Recoverable problems inside an otherwise readable document are reported
/// as [`crate::codec::CodecWarning`] instead.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document root must be a JSON object")]
    NotAnObject,

    #[error("`elements` must be an array")]
    ElementsNotArray,

    #[error(transparent)]
    Model(#[from] ModelError),
}
