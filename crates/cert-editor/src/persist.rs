//! Template persistence boundary.
//!
//! The backend is reached through the async [`TemplateStore`] trait. A save
//! is split in three so the session is never borrowed across an await:
//!
//! 1. [`crate::EditorSession::prepare_save`] builds a [`SaveRequest`]
//!    synchronously (document JSON, preview, ticket).
//! 2. [`SaveRequest::submit`] talks to the store.
//! 3. [`crate::EditorSession::acknowledge_save`] applies the outcome, or
//!    ignores it when the ticket belongs to a session that has since been
//!    disposed or switched to another template.

use crate::session::SessionToken;
use async_trait::async_trait;
use cert_core::model::Orientation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

// ─── Types ───────────────────────────────────────────────────────────────

/// Backend identifier of a stored template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the backend stores for a template, minus its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// The document JSON, stored as a string.
    pub document_json: String,
    /// `data:image/png;base64,…`
    #[serde(default)]
    pub preview_image: String,
    #[serde(default)]
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    #[serde(flatten)]
    pub payload: TemplatePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("template {0} not found")]
    NotFound(TemplateId),

    #[error("template store unreachable: {0}")]
    Transport(String),

    #[error("template rejected: {0}")]
    Rejected(String),
}

// ─── Store ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError>;

    async fn get_template(&self, id: &TemplateId) -> Result<Template, StoreError>;

    async fn create_template(&self, payload: TemplatePayload) -> Result<Template, StoreError>;

    async fn update_template(&self, id: &TemplateId, payload: TemplatePayload) -> Result<Template, StoreError>;

    async fn delete_template(&self, id: &TemplateId) -> Result<(), StoreError>;

    /// The template bound to `course_id`, falling back to the default
    /// template. `None` when neither exists.
    async fn get_template_for_course(&self, course_id: &str) -> Result<Option<Template>, StoreError>;
}

/// In-process store, used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    inner: Mutex<MemoryInner>,
    offline: AtomicBool,
}

#[derive(Debug, Default)]
struct MemoryInner {
    templates: BTreeMap<TemplateId, Template>,
    next_id: u64,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Transport`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            Err(StoreError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

fn validate(payload: &TemplatePayload) -> Result<(), StoreError> {
    if payload.name.trim().is_empty() {
        return Err(StoreError::Rejected("name is required".into()));
    }
    if payload.canvas_width == 0 || payload.canvas_height == 0 {
        return Err(StoreError::Rejected("canvas size must be positive".into()));
    }
    match serde_json::from_str::<serde_json::Value>(&payload.document_json) {
        Ok(v) if v.is_object() => Ok(()),
        _ => Err(StoreError::Rejected("documentJson is not a JSON object".into())),
    }
}

impl MemoryInner {
    /// Only one template may be the default.
    fn claim_default(&mut self, id: &TemplateId) {
        for (other_id, t) in self.templates.iter_mut() {
            if other_id != id {
                t.payload.is_default = false;
            }
        }
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        self.reachable()?;
        Ok(self.inner.lock().await.templates.values().cloned().collect())
    }

    async fn get_template(&self, id: &TemplateId) -> Result<Template, StoreError> {
        self.reachable()?;
        self.inner
            .lock()
            .await
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn create_template(&self, payload: TemplatePayload) -> Result<Template, StoreError> {
        self.reachable()?;
        validate(&payload)?;
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = TemplateId(format!("tpl-{}", inner.next_id));
        if payload.is_default {
            inner.claim_default(&id);
        }
        let template = Template { id: id.clone(), payload };
        inner.templates.insert(id, template.clone());
        log::debug!("created template {}", template.id);
        Ok(template)
    }

    async fn update_template(&self, id: &TemplateId, payload: TemplatePayload) -> Result<Template, StoreError> {
        self.reachable()?;
        validate(&payload)?;
        let mut inner = self.inner.lock().await;
        if !inner.templates.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        if payload.is_default {
            inner.claim_default(id);
        }
        let template = Template { id: id.clone(), payload };
        inner.templates.insert(id.clone(), template.clone());
        log::debug!("updated template {id}");
        Ok(template)
    }

    async fn delete_template(&self, id: &TemplateId) -> Result<(), StoreError> {
        self.reachable()?;
        match self.inner.lock().await.templates.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn get_template_for_course(&self, course_id: &str) -> Result<Option<Template>, StoreError> {
        self.reachable()?;
        let inner = self.inner.lock().await;
        let specific = inner
            .templates
            .values()
            .find(|t| t.payload.course_id.as_deref() == Some(course_id));
        let fallback = || inner.templates.values().find(|t| t.payload.is_default);
        Ok(specific.or_else(fallback).cloned())
    }
}

// ─── Save flow ───────────────────────────────────────────────────────────

/// Binds a save to the session state it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub token: SessionToken,
    /// The template the session was editing, if it was already stored.
    pub template_id: Option<TemplateId>,
}

/// A save ready to be sent. Holds no reference to the session.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub payload: TemplatePayload,
}

#[derive(Debug)]
pub struct SaveOutcome {
    pub ticket: SaveTicket,
    pub result: Result<Template, StoreError>,
}

/// What [`crate::EditorSession::acknowledge_save`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAck {
    /// The session now tracks this stored template.
    Applied(TemplateId),
    /// The store refused or could not be reached. Nothing changed.
    Failed(StoreError),
    /// The session was disposed or moved on. Nothing changed.
    Stale,
}

impl SaveRequest {
    /// Create or update, depending on whether the template was stored before.
    pub async fn submit(self, store: &dyn TemplateStore) -> SaveOutcome {
        let result = match &self.ticket.template_id {
            Some(id) => store.update_template(id, self.payload).await,
            None => store.create_template(self.payload).await,
        };
        if let Err(err) = &result {
            log::warn!("template save failed: {err}");
        }
        SaveOutcome {
            ticket: self.ticket,
            result,
        }
    }

    /// Fire-and-forget save on the runtime. The outcome can still be
    /// acknowledged later, or dropped.
    pub fn spawn(self, store: Arc<dyn TemplateStore>) -> tokio::task::JoinHandle<SaveOutcome> {
        tokio::spawn(async move { self.submit(store.as_ref()).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, course: Option<&str>, is_default: bool) -> TemplatePayload {
        TemplatePayload {
            name: name.into(),
            course_id: course.map(Into::into),
            is_default,
            canvas_width: 1123,
            canvas_height: 794,
            document_json: r#"{"canvasWidth":1123,"canvasHeight":794,"elements":[]}"#.into(),
            preview_image: String::new(),
            orientation: Orientation::Landscape,
        }
    }

    #[tokio::test]
    async fn crud() {
        let store = MemoryTemplateStore::new();
        let created = store.create_template(payload("A", None, false)).await.unwrap();
        assert_eq!(store.get_template(&created.id).await.unwrap(), created);

        let updated = store
            .update_template(&created.id, payload("B", None, false))
            .await
            .unwrap();
        assert_eq!(updated.payload.name, "B");
        assert_eq!(store.list_templates().await.unwrap().len(), 1);

        store.delete_template(&created.id).await.unwrap();
        assert_eq!(
            store.get_template(&created.id).await,
            Err(StoreError::NotFound(created.id.clone()))
        );
    }

    #[tokio::test]
    async fn course_template_falls_back_to_default() {
        let store = MemoryTemplateStore::new();
        let default = store.create_template(payload("Default", None, true)).await.unwrap();
        let rust = store.create_template(payload("Rust", Some("rust-101"), false)).await.unwrap();

        let found = store.get_template_for_course("rust-101").await.unwrap().unwrap();
        assert_eq!(found.id, rust.id);
        let found = store.get_template_for_course("go-101").await.unwrap().unwrap();
        assert_eq!(found.id, default.id);
    }

    #[tokio::test]
    async fn single_default() {
        let store = MemoryTemplateStore::new();
        let first = store.create_template(payload("One", None, true)).await.unwrap();
        store.create_template(payload("Two", None, true)).await.unwrap();
        assert!(!store.get_template(&first.id).await.unwrap().payload.is_default);
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected() {
        let store = MemoryTemplateStore::new();
        let mut bad = payload("  ", None, false);
        assert!(matches!(store.create_template(bad.clone()).await, Err(StoreError::Rejected(_))));
        bad.name = "ok".into();
        bad.document_json = "[]".into();
        assert!(matches!(store.create_template(bad).await, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn offline_store_fails_with_transport() {
        let store = MemoryTemplateStore::new();
        store.set_offline(true);
        assert!(matches!(store.list_templates().await, Err(StoreError::Transport(_))));
    }

    #[test]
    fn payload_wire_names() {
        let json = serde_json::to_value(Template {
            id: TemplateId::new("t1"),
            payload: payload("A", Some("c1"), true),
        })
        .unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["courseId"], "c1");
        assert_eq!(json["isDefault"], true);
        assert_eq!(json["canvasWidth"], 1123);
        assert_eq!(json["orientation"], "landscape");
        assert!(json.get("documentJson").is_some());
    }
}
