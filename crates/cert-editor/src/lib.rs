pub mod config;
pub mod error;
pub mod history;
pub mod image_load;
pub mod persist;
pub mod selection;
pub mod session;
pub mod shortcuts;

pub use config::{ConfigError, EditorConfig};
pub use error::EditError;
pub use history::{HistoryEntry, HistoryError, HistoryManager, HistoryStep};
pub use image_load::{ImageLoadError, load_image};
pub use persist::{
    MemoryTemplateStore, SaveAck, SaveOutcome, SaveRequest, SaveTicket, StoreError, Template, TemplateId,
    TemplatePayload, TemplateStore,
};
pub use selection::{PropertyEdit, PropertyView};
pub use session::{Applied, EditMutation, EditorSession, Performed, SessionToken};
pub use shortcuts::{ShortcutAction, ShortcutMap};
