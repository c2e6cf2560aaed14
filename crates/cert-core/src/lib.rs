pub mod archetype;
pub mod bindings;
pub mod codec;
pub mod error;
pub mod geometry;
pub mod id;
pub mod lint;
pub mod model;
pub mod placeholder;

pub use archetype::{archetype, starter_document};
pub use bindings::{PlaceholderValues, placeholder_bindings};
pub use codec::{CodecWarning, Decoded, DocumentJson, DocumentSnapshot, deserialize, load_document, serialize};
pub use error::{CodecError, ModelError};
pub use id::ElementId;
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use model::*;
pub use placeholder::{Notice, PlaceholderEnforcer};

// Re-export kurbo so downstream crates share the geometry types.
pub use kurbo;
