//! Document ↔ JSON.
//!
//! Encoding is deterministic and drops ephemeral elements. Decoding is
//! lenient: missing fields fall back to archetype (or generic) defaults,
//! unknown element kinds are dropped with a warning, and stray or duplicated
//! roles are demoted so the result never violates the one-element-per-role
//! invariant. [`load_document`] additionally re-creates missing placeholders.

use crate::archetype::archetype;
use crate::error::CodecError;
use crate::id::ElementId;
use crate::model::{
    Color, Document, Element, ElementKind, FontStyle, GroupData, ImageData, Orientation, PlaceholderRole, ShapeData,
    ShapeKind, TextAlign, TextData, TextStyle,
};
use crate::placeholder::PlaceholderEnforcer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

// ─── Wire format ─────────────────────────────────────────────────────────

/// The persisted document (`Template.documentJson`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentJson {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: String,
    pub elements: Vec<ElementJson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementJson {
    #[serde(flatten)]
    pub body: BodyJson,
    pub id: String,
    pub role: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BodyJson {
    Text {
        text: String,
        font_family: String,
        font_size: f64,
        font_weight: u16,
        font_style: FontStyle,
        underline: bool,
        fill: String,
        text_align: TextAlign,
    },
    Shape {
        shape: &'static str,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f64,
        corner_radius: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        sides: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        points: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        inner_ratio: Option<f64>,
    },
    Image {
        src: String,
        natural_width: u32,
        natural_height: u32,
    },
    Group {
        children: Vec<ElementJson>,
    },
}

const ROLE_NONE: &str = "none";

// ─── Encoding ────────────────────────────────────────────────────────────

/// Encode a document. Ephemeral elements (at any depth) are skipped.
pub fn serialize(doc: &Document) -> DocumentJson {
    DocumentJson {
        canvas_width: doc.canvas_width(),
        canvas_height: doc.canvas_height(),
        background: doc.background().to_hex(),
        elements: encode_elements(doc.elements()),
    }
}

pub fn to_value(doc: &Document) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(serialize(doc))?)
}

pub fn to_json_string(doc: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&serialize(doc))?)
}

pub fn to_json_string_pretty(doc: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(&serialize(doc))?)
}

fn encode_elements(elements: &[Element]) -> Vec<ElementJson> {
    elements.iter().filter(|e| !e.ephemeral).map(encode_element).collect()
}

fn encode_element(e: &Element) -> ElementJson {
    let body = match &e.kind {
        ElementKind::Text(t) => BodyJson::Text {
            text: t.content.clone(),
            font_family: t.style.font_family.clone(),
            font_size: t.style.font_size,
            font_weight: t.style.font_weight,
            font_style: t.style.font_style,
            underline: t.style.underline,
            fill: t.style.color.to_hex(),
            text_align: t.style.align,
        },
        ElementKind::Shape(s) => {
            let (sides, points, inner_ratio) = match s.shape {
                ShapeKind::Polygon { sides } => (Some(sides), None, None),
                ShapeKind::Star { points, inner_ratio } => (None, Some(points), Some(inner_ratio)),
                _ => (None, None, None),
            };
            BodyJson::Shape {
                shape: s.shape.name(),
                fill: s.fill.map(|c| c.to_hex()),
                stroke: s.stroke.map(|c| c.to_hex()),
                stroke_width: s.stroke_width,
                corner_radius: s.corner_radius,
                sides,
                points,
                inner_ratio,
            }
        }
        ElementKind::Image(i) => BodyJson::Image {
            src: i.src.clone(),
            natural_width: i.natural_width,
            natural_height: i.natural_height,
        },
        ElementKind::Group(g) => BodyJson::Group {
            children: encode_elements(&g.children),
        },
    };
    ElementJson {
        body,
        id: e.id.as_str().to_string(),
        role: e.role.map_or(ROLE_NONE, |r| r.as_str()).to_string(),
        x: e.x,
        y: e.y,
        width: e.width,
        height: e.height,
        rotation: e.rotation,
        opacity: e.opacity,
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────

/// A recoverable problem found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecWarning {
    /// Element at `path` (e.g. `elements[3]` or `elements[2].children[0]`) was dropped.
    DroppedElement { path: String, reason: String },
    /// An unreadable field was replaced by its default.
    DefaultedField { path: String, field: &'static str },
    /// A second element claimed a role, or a group child carried one.
    DemotedRole { path: String, role: String },
    /// A missing or duplicated id was replaced.
    RegeneratedId { path: String },
    /// A missing placeholder was synthesized by [`load_document`].
    SynthesizedPlaceholder { role: PlaceholderRole },
}

/// The decoded document plus everything that had to be repaired.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub document: Document,
    pub warnings: Vec<CodecWarning>,
}

/// Parse a JSON string, then [`deserialize`].
pub fn from_json_str(json: &str) -> Result<Decoded, CodecError> {
    let value: Value = serde_json::from_str(json)?;
    deserialize(&value)
}

/// Rebuild a document from its JSON value. Placeholders are not
/// synthesized; use [`load_document`] for that.
pub fn deserialize(value: &Value) -> Result<Decoded, CodecError> {
    let root = value.as_object().ok_or(CodecError::NotAnObject)?;
    let mut cx = DecodeContext::default();

    let (default_w, default_h) = Orientation::default().dimensions();
    let canvas_width = cx.dimension(root, "canvasWidth", default_w);
    let canvas_height = cx.dimension(root, "canvasHeight", default_h);
    let background = match root.get("background") {
        None | Some(Value::Null) => Color::WHITE,
        Some(v) => v.as_str().and_then(Color::from_hex).unwrap_or_else(|| {
            cx.default_field("document", "background");
            Color::WHITE
        }),
    };

    let elements = match root.get("elements") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => cx.decode_list(items, "elements", true, canvas_width, canvas_height),
        Some(_) => return Err(CodecError::ElementsNotArray),
    };

    for warning in &cx.warnings {
        log::warn!("document decode: {warning:?}");
    }
    Ok(Decoded {
        document: Document::from_parts(canvas_width, canvas_height, background, elements),
        warnings: cx.warnings,
    })
}

/// Decode and then re-create any missing placeholder. This is what template
/// open uses.
pub fn load_document(json: &str) -> Result<Decoded, CodecError> {
    let mut decoded = from_json_str(json)?;
    let mut enforcer = PlaceholderEnforcer::new(&decoded.document);
    for role in enforcer.ensure_all_present(&mut decoded.document) {
        decoded.warnings.push(CodecWarning::SynthesizedPlaceholder { role });
    }
    decoded.document.drain_events();
    Ok(decoded)
}

#[derive(Default)]
struct DecodeContext {
    warnings: Vec<CodecWarning>,
    seen_ids: HashSet<ElementId>,
    seen_roles: HashSet<PlaceholderRole>,
}

impl DecodeContext {
    fn default_field(&mut self, path: &str, field: &'static str) {
        self.warnings.push(CodecWarning::DefaultedField {
            path: path.to_string(),
            field,
        });
    }

    fn dimension(&mut self, root: &Map<String, Value>, key: &'static str, default: u32) -> u32 {
        match root.get(key) {
            None => default,
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => n,
                _ => {
                    self.default_field("document", key);
                    default
                }
            },
        }
    }

    fn decode_list(&mut self, items: &[Value], prefix: &str, top_level: bool, cw: u32, ch: u32) -> Vec<Element> {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.decode_element(item, &format!("{prefix}[{i}]"), top_level, cw, ch))
            .collect()
    }

    fn decode_element(&mut self, item: &Value, path: &str, top_level: bool, cw: u32, ch: u32) -> Option<Element> {
        let Some(obj) = item.as_object() else {
            self.drop_element(path, "not an object");
            return None;
        };
        let f = Fields { obj, path };

        let role = self.decode_role(&f, top_level);
        let fallback = role.map(|r| archetype(r, cw, ch));

        let kind = self.decode_kind(&f, fallback.as_ref(), cw, ch)?;
        let base = fallback.filter(|a| std::mem::discriminant(&a.kind) == std::mem::discriminant(&kind));

        let id = self.decode_id(&f, &kind);
        let geom = |key: &str, generic: f64, pick: fn(&Element) -> f64| {
            f.f64(key).unwrap_or_else(|| base.as_ref().map_or(generic, pick))
        };
        Some(Element {
            id,
            role,
            x: geom("x", 0.0, |e| e.x),
            y: geom("y", 0.0, |e| e.y),
            width: geom("width", 100.0, |e| e.width),
            height: geom("height", 100.0, |e| e.height),
            rotation: f.f64("rotation").unwrap_or(0.0),
            opacity: f.f64("opacity").unwrap_or(1.0).clamp(0.0, 1.0),
            ephemeral: false,
            kind,
        })
    }

    fn drop_element(&mut self, path: &str, reason: impl Into<String>) {
        self.warnings.push(CodecWarning::DroppedElement {
            path: path.to_string(),
            reason: reason.into(),
        });
    }

    fn decode_role(&mut self, f: &Fields<'_>, top_level: bool) -> Option<PlaceholderRole> {
        let raw = f.str("role").filter(|r| *r != ROLE_NONE)?;
        let demote = |cx: &mut Self| {
            cx.warnings.push(CodecWarning::DemotedRole {
                path: f.path.to_string(),
                role: raw.to_string(),
            });
            None
        };
        let Ok(role) = raw.parse::<PlaceholderRole>() else {
            return demote(self);
        };
        if !top_level || !self.seen_roles.insert(role) {
            return demote(self);
        }
        Some(role)
    }

    fn decode_id(&mut self, f: &Fields<'_>, kind: &ElementKind) -> ElementId {
        if let Some(raw) = f.str("id").filter(|s| !s.is_empty()) {
            let id = ElementId::intern(raw);
            if self.seen_ids.insert(id) {
                return id;
            }
            self.warnings.push(CodecWarning::RegeneratedId {
                path: f.path.to_string(),
            });
        }
        let id = ElementId::with_prefix(kind.name());
        self.seen_ids.insert(id);
        id
    }

    fn decode_kind(&mut self, f: &Fields<'_>, fallback: Option<&Element>, cw: u32, ch: u32) -> Option<ElementKind> {
        let (kind, legacy_shape) = match (f.str("kind"), f.str("type")) {
            (Some(kind), _) => (kind, None),
            // Older saves carried the canvas library's object type instead.
            (None, Some("textbox" | "text" | "i-text")) => ("text", None),
            (None, Some("image")) => ("image", None),
            (None, Some("group")) => ("group", None),
            (None, Some(t @ ("rect" | "circle" | "ellipse" | "triangle" | "polygon" | "line"))) => {
                ("shape", Some(if t == "circle" { "ellipse" } else { t }))
            }
            (None, other) => {
                self.drop_element(f.path, format!("unknown element kind {:?}", other.unwrap_or("<missing>")));
                return None;
            }
        };

        match kind {
            "text" => {
                let base = match fallback.map(|e| &e.kind) {
                    Some(ElementKind::Text(t)) => t.clone(),
                    _ => TextData {
                        content: String::new(),
                        style: TextStyle::default(),
                    },
                };
                let d = base.style;
                let style = TextStyle {
                    font_family: f.str("fontFamily").map_or(d.font_family, str::to_string),
                    font_size: f.f64("fontSize").unwrap_or(d.font_size),
                    font_weight: f.u64("fontWeight").map_or(d.font_weight, TextStyle::clamp_weight),
                    font_style: f.parse("fontStyle").unwrap_or(d.font_style),
                    underline: f.bool("underline").unwrap_or(d.underline),
                    color: self.color(f, "fill").flatten().unwrap_or(d.color),
                    align: f.parse("textAlign").unwrap_or(d.align),
                };
                Some(ElementKind::Text(TextData {
                    content: f.str("text").map_or(base.content, str::to_string),
                    style,
                }))
            }
            "shape" => {
                let shape = match legacy_shape.or(f.str("shape")).unwrap_or("rect") {
                    "rect" => ShapeKind::Rect,
                    "ellipse" => ShapeKind::Ellipse,
                    "triangle" => ShapeKind::Triangle,
                    "line" => ShapeKind::Line,
                    "polygon" => ShapeKind::Polygon {
                        sides: f.u64("sides").map_or(6, ShapeKind::clamp_vertices),
                    },
                    "star" => ShapeKind::Star {
                        points: f.u64("points").map_or(5, ShapeKind::clamp_vertices),
                        inner_ratio: f.f64("innerRatio").unwrap_or(0.5),
                    },
                    other => {
                        self.drop_element(f.path, format!("unknown shape {other:?}"));
                        return None;
                    }
                };
                let d = ShapeData::new(shape);
                Some(ElementKind::Shape(ShapeData {
                    shape,
                    fill: self.color(f, "fill").unwrap_or(d.fill),
                    stroke: self.color(f, "stroke").unwrap_or(d.stroke),
                    stroke_width: f.f64("strokeWidth").unwrap_or(d.stroke_width),
                    corner_radius: f.f64("cornerRadius").unwrap_or(d.corner_radius),
                }))
            }
            "image" => {
                let Some(src) = f.str("src") else {
                    self.drop_element(f.path, "image without src");
                    return None;
                };
                Some(ElementKind::Image(ImageData {
                    src: src.to_string(),
                    natural_width: f.u64("naturalWidth").map_or(0, |n| n as u32),
                    natural_height: f.u64("naturalHeight").map_or(0, |n| n as u32),
                }))
            }
            "group" => {
                let children = match f.obj.get("children") {
                    Some(Value::Array(items)) => {
                        self.decode_list(items, &format!("{}.children", f.path), false, cw, ch)
                    }
                    _ => match fallback.map(|e| &e.kind) {
                        Some(ElementKind::Group(g)) => g.children.clone(),
                        _ => Vec::new(),
                    },
                };
                Some(ElementKind::Group(GroupData { children }))
            }
            other => {
                self.drop_element(f.path, format!("unknown element kind {other:?}"));
                None
            }
        }
    }

    /// `None` = field absent, `Some(None)` = explicit null, `Some(Some(c))` = color.
    fn color(&mut self, f: &Fields<'_>, key: &'static str) -> Option<Option<Color>> {
        match f.obj.get(key)? {
            Value::Null => Some(None),
            Value::String(s) if s.is_empty() || s == "transparent" => Some(None),
            Value::String(s) => match Color::from_hex(s) {
                Some(c) => Some(Some(c)),
                None => {
                    self.default_field(f.path, key);
                    None
                }
            },
            _ => {
                self.default_field(f.path, key);
                None
            }
        }
    }
}

/// Typed accessors over one element's JSON object.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    fn str(&self, key: &str) -> Option<&'a str> {
        self.obj.get(key)?.as_str()
    }

    fn f64(&self, key: &str) -> Option<f64> {
        self.obj.get(key)?.as_f64().filter(|n| n.is_finite())
    }

    fn u64(&self, key: &str) -> Option<u64> {
        let v = self.obj.get(key)?;
        v.as_u64().or_else(|| v.as_f64().filter(|n| *n >= 0.0).map(|n| n.round() as u64))
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.obj.get(key)?.as_bool()
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        serde_json::from_value(self.obj.get(key)?.clone()).ok()
    }
}

// ─── Snapshots ───────────────────────────────────────────────────────────

/// A trusted, lossless copy of a document's content without ephemeral
/// elements. Used for history entries; it skips the lenient JSON path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Color,
    pub elements: Vec<Element>,
}

impl From<&Document> for DocumentSnapshot {
    fn from(doc: &Document) -> Self {
        let clean = doc.without_ephemeral();
        Self {
            canvas_width: clean.canvas_width(),
            canvas_height: clean.canvas_height(),
            background: clean.background(),
            elements: clean.elements().to_vec(),
        }
    }
}

impl DocumentSnapshot {
    pub fn into_document(self) -> Document {
        Document::from_parts(self.canvas_width, self.canvas_height, self.background, self.elements)
    }
}
