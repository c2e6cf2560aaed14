use crate::config::ConfigError;
use crate::history::HistoryError;
use cert_core::{CodecError, ModelError};
use cert_render::RenderError;
use thiserror::Error;

/// Why an editing operation was refused. The document and history are
/// unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{property} does not apply to {kind} elements")]
    NotApplicable { property: &'static str, kind: &'static str },

    #[error("{value} is not a valid {property}")]
    InvalidValue { property: &'static str, value: f64 },

    #[error("nothing is selected")]
    NothingSelected,

    #[error("grid guides are not editable")]
    Ephemeral,

    #[error("the editing session has been closed")]
    Disposed,

    #[error("the editing session has moved on to another document")]
    Stale,
}
