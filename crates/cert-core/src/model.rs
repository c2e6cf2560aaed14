//! Core document model for certificate templates.
//!
//! A document is an ordered list of elements painted back to front, plus the
//! canvas size and background. Elements are plain data: text, shapes, embedded
//! images, and groups of sub-elements. Five top-level elements carry a
//! [`PlaceholderRole`] and are substituted with per-learner data when a
//! certificate is issued; the document guarantees each role appears exactly
//! once (see [`crate::placeholder`]).
//!
//! Every mutation except the whole-document replacements records a
//! [`DocumentEvent`], which the editing session drains after each operation.

use crate::error::ModelError;
use crate::id::ElementId;
use crate::placeholder::{self, Notice};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ─── Colors ──────────────────────────────────────────────────────────────

/// 8-bit RGBA color, serialized as a lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };
        let single = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? * 17) };

        match bytes.len() {
            3 => Some(Self::rgb(single(0)?, single(1)?, single(2)?)),
            4 => Some(Self::rgba(single(0)?, single(1)?, single(2)?, single(3)?)),
            6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Emit as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Placeholder roles ───────────────────────────────────────────────────

/// The fixed set of protected placeholder roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaceholderRole {
    StudentName,
    CourseTitle,
    IssueDate,
    QrCode,
    VerificationUrl,
}

impl PlaceholderRole {
    pub const ALL: [PlaceholderRole; 5] = [
        PlaceholderRole::StudentName,
        PlaceholderRole::CourseTitle,
        PlaceholderRole::IssueDate,
        PlaceholderRole::QrCode,
        PlaceholderRole::VerificationUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderRole::StudentName => "STUDENT_NAME",
            PlaceholderRole::CourseTitle => "COURSE_TITLE",
            PlaceholderRole::IssueDate => "ISSUE_DATE",
            PlaceholderRole::QrCode => "QR_CODE",
            PlaceholderRole::VerificationUrl => "VERIFICATION_URL",
        }
    }

    /// The `{{ROLE}}` token shown on the canvas until issuance.
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.as_str())
    }
}

impl fmt::Display for PlaceholderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceholderRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlaceholderRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or(())
    }
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Horizontal text alignment inside the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Lightest and heaviest CSS font weight the model stores.
pub const FONT_WEIGHT_MIN: u16 = 100;
pub const FONT_WEIGHT_MAX: u16 = 900;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    /// CSS weight, 100..900.
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub underline: bool,
    pub color: Color,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Georgia".into(),
            font_size: 24.0,
            font_weight: 400,
            font_style: FontStyle::Normal,
            underline: false,
            color: Color::rgb(0x22, 0x22, 0x22),
            align: TextAlign::Center,
        }
    }
}

impl TextStyle {
    /// Clamp a raw weight into `FONT_WEIGHT_MIN..=FONT_WEIGHT_MAX`.
    pub fn clamp_weight(weight: u64) -> u16 {
        weight.clamp(FONT_WEIGHT_MIN.into(), FONT_WEIGHT_MAX.into()) as u16
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
    pub style: TextStyle,
}

// ─── Shapes ──────────────────────────────────────────────────────────────

/// Vertex bounds for polygon sides and star points.
pub const VERTICES_MIN: u8 = 3;
pub const VERTICES_MAX: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rect,
    Ellipse,
    Triangle,
    /// Regular polygon inscribed in the element box.
    Polygon { sides: u8 },
    /// Diagonal from the top-left to the bottom-right of the box.
    Line,
    Star { points: u8, inner_ratio: f64 },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Polygon { .. } => "polygon",
            ShapeKind::Line => "line",
            ShapeKind::Star { .. } => "star",
        }
    }

    pub fn clamp_vertices(count: u64) -> u8 {
        count.clamp(VERTICES_MIN.into(), VERTICES_MAX.into()) as u8
    }

    /// Whether `corner_radius` has any effect on this shape.
    pub fn supports_corner_radius(&self) -> bool {
        matches!(self, ShapeKind::Rect)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeData {
    pub shape: ShapeKind,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub corner_radius: f64,
}

impl ShapeData {
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            fill: None,
            stroke: Some(Color::BLACK),
            stroke_width: 1.0,
            corner_radius: 0.0,
        }
    }

    pub fn filled(mut self, fill: Color) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn stroked(mut self, stroke: Option<Color>, width: f64) -> Self {
        self.stroke = stroke;
        self.stroke_width = width;
        self
    }
}

// ─── Images & groups ─────────────────────────────────────────────────────

/// An embedded bitmap. `src` is a data URL or a remote URL; the natural
/// size is recorded when the image is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub src: String,
    pub natural_width: u32,
    pub natural_height: u32,
}

/// Sub-elements composed as one unit. Child coordinates are relative to the
/// group's top-left corner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupData {
    pub children: Vec<Element>,
}

// ─── Elements ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Text(TextData),
    Shape(ShapeData),
    Image(ImageData),
    Group(GroupData),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Shape(_) => "shape",
            ElementKind::Image(_) => "image",
            ElementKind::Group(_) => "group",
        }
    }
}

/// A drawable unit on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// `None` for ordinary elements, otherwise the protected placeholder role.
    pub role: Option<PlaceholderRole>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, clockwise, about the element center.
    pub rotation: f64,
    /// 0.0 (transparent) ..= 1.0 (opaque).
    pub opacity: f64,
    /// Visual aids such as grid lines. Never saved, snapshotted, or exported.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Element {
    /// Create an element with a fresh id prefixed by its kind name.
    pub fn new(kind: ElementKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: ElementId::with_prefix(kind.name()),
            kind,
            role: None,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            opacity: 1.0,
            ephemeral: false,
        }
    }

    pub fn text(content: impl Into<String>, style: TextStyle, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            ElementKind::Text(TextData {
                content: content.into(),
                style,
            }),
            x,
            y,
            width,
            height,
        )
    }

    pub fn shape(data: ShapeData, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ElementKind::Shape(data), x, y, width, height)
    }

    pub fn image(data: ImageData, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ElementKind::Image(data), x, y, width, height)
    }

    pub fn group(children: Vec<Element>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ElementKind::Group(GroupData { children }), x, y, width, height)
    }

    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = id;
        self
    }

    pub fn with_role(mut self, role: PlaceholderRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn into_ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.role.is_some()
    }

    /// Deep copy with fresh ids for this element and all descendants.
    /// The role is not copied.
    pub fn clone_with_fresh_ids(&self) -> Element {
        let mut copy = self.clone();
        copy.role = None;
        copy.refresh_ids();
        copy
    }

    fn refresh_ids(&mut self) {
        self.id = ElementId::with_prefix(self.kind.name());
        if let ElementKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.refresh_ids();
            }
        }
    }

    /// Visit this element's descendants (not the element itself).
    pub fn for_each_descendant(&self, f: &mut impl FnMut(&Element)) {
        if let ElementKind::Group(group) = &self.kind {
            for child in &group.children {
                f(child);
                child.for_each_descendant(f);
            }
        }
    }

    /// Clamp bounded attributes (opacity, font weight, vertex counts) into
    /// their ranges, descendants included.
    pub fn normalize(&mut self) {
        self.opacity = self.opacity.clamp(0.0, 1.0);
        match &mut self.kind {
            ElementKind::Text(t) => {
                t.style.font_weight = TextStyle::clamp_weight(t.style.font_weight.into());
            }
            ElementKind::Shape(s) => match &mut s.shape {
                ShapeKind::Polygon { sides } => *sides = ShapeKind::clamp_vertices((*sides).into()),
                ShapeKind::Star { points, .. } => *points = ShapeKind::clamp_vertices((*points).into()),
                _ => {}
            },
            ElementKind::Image(_) => {}
            ElementKind::Group(g) => g.children.iter_mut().for_each(Element::normalize),
        }
    }

    /// Name of the first NaN or infinite attribute on this element or a
    /// descendant, with the id of the element holding it.
    pub fn non_finite(&self) -> Option<(ElementId, &'static str)> {
        let mut fields = vec![
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
            ("opacity", self.opacity),
        ];
        match &self.kind {
            ElementKind::Text(t) => fields.push(("fontSize", t.style.font_size)),
            ElementKind::Shape(s) => {
                fields.push(("strokeWidth", s.stroke_width));
                fields.push(("cornerRadius", s.corner_radius));
                if let ShapeKind::Star { inner_ratio, .. } = s.shape {
                    fields.push(("innerRatio", inner_ratio));
                }
            }
            ElementKind::Image(_) => {}
            ElementKind::Group(g) => {
                if let Some(found) = g.children.iter().find_map(Element::non_finite) {
                    return Some(found);
                }
            }
        }
        fields
            .into_iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(field, _)| (self.id, field))
    }

    /// First role found on a descendant, if any. Roles are only valid on
    /// top-level elements.
    pub fn nested_role(&self) -> Option<PlaceholderRole> {
        let mut found = None;
        self.for_each_descendant(&mut |child| {
            if found.is_none() {
                found = child.role;
            }
        });
        found
    }
}

// ─── Canvas orientation ──────────────────────────────────────────────────

/// Canvas presets, A4 at 96 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub const A4_LONG: u32 = 1123;
    pub const A4_SHORT: u32 = 794;

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Orientation::Landscape => (Self::A4_LONG, Self::A4_SHORT),
            Orientation::Portrait => (Self::A4_SHORT, Self::A4_LONG),
        }
    }

    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────

/// What part of an element (or the canvas) a modification touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Move, resize, rotate.
    Geometry,
    /// Fill, stroke, font, opacity, background.
    Style,
    /// Text composition.
    Content,
    /// Z-order change.
    Order,
    /// Canvas dimensions.
    CanvasSize,
}

impl ChangeKind {
    /// Structural changes are checkpointed as soon as they complete; the
    /// rest are coalesced until a commit event.
    pub fn is_structural(&self) -> bool {
        matches!(self, ChangeKind::Order | ChangeKind::CanvasSize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    ElementAdded { id: ElementId, index: usize },
    ElementRemoved { id: ElementId, index: usize, role: Option<PlaceholderRole> },
    ElementModified { id: ElementId, change: ChangeKind },
    CanvasModified { change: ChangeKind },
}

impl DocumentEvent {
    pub fn is_structural(&self) -> bool {
        match self {
            DocumentEvent::ElementAdded { .. } | DocumentEvent::ElementRemoved { .. } => true,
            DocumentEvent::ElementModified { change, .. } | DocumentEvent::CanvasModified { change } => {
                change.is_structural()
            }
        }
    }
}

// ─── Removal ─────────────────────────────────────────────────────────────

/// Where a removal request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOrigin {
    /// An explicit "delete" by the user. Placeholders are refused.
    UserDelete,
    /// An indirect structural operation. Placeholders are restored afterwards.
    Structural,
}

/// The outcome of a successful removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub element: Element,
    pub index: usize,
    /// Set when the removed element was a placeholder and was re-created.
    pub restored: Option<Notice>,
}

/// Z-order moves. Single steps clamp at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Forward,
    Backward,
    Front,
    Back,
}

// ─── Document ────────────────────────────────────────────────────────────

fn next_lineage() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static LINEAGE: AtomicU64 = AtomicU64::new(1);
    LINEAGE.fetch_add(1, Ordering::Relaxed)
}

/// The root aggregate: canvas attributes plus elements in paint order.
#[derive(Debug, Clone)]
pub struct Document {
    canvas_width: u32,
    canvas_height: u32,
    background: Color,
    elements: Vec<Element>,
    /// Identifies this document across in-place history restores. A document
    /// swapped in from elsewhere carries a different lineage.
    lineage: u64,
    events: Vec<DocumentEvent>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.canvas_width == other.canvas_width
            && self.canvas_height == other.canvas_height
            && self.background == other.background
            && self.elements == other.elements
    }
}

impl Document {
    /// Create an empty document. Placeholders are added by
    /// [`crate::placeholder::PlaceholderEnforcer::ensure_all_present`] or by
    /// starting from [`crate::archetype::starter_document`].
    pub fn new(canvas_width: u32, canvas_height: u32) -> Result<Self, ModelError> {
        if canvas_width == 0 || canvas_height == 0 {
            return Err(ModelError::InvalidCanvasSize {
                width: canvas_width,
                height: canvas_height,
            });
        }
        Ok(Self::from_parts(canvas_width, canvas_height, Color::WHITE, Vec::new()))
    }

    pub fn with_orientation(orientation: Orientation) -> Self {
        let (w, h) = orientation.dimensions();
        Self::from_parts(w, h, Color::WHITE, Vec::new())
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(self.canvas_width, self.canvas_height)
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Elements back to front.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn lineage(&self) -> u64 {
        self.lineage
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_with_role(&self, role: PlaceholderRole) -> Option<&Element> {
        self.elements.iter().find(|e| e.role == Some(role))
    }

    /// Placeholder roles currently present.
    pub fn roles_present(&self) -> BTreeSet<PlaceholderRole> {
        self.elements.iter().filter_map(|e| e.role).collect()
    }

    /// Number of elements carrying `role`.
    pub fn role_count(&self, role: PlaceholderRole) -> usize {
        self.elements.iter().filter(|e| e.role == Some(role)).count()
    }

    /// Whether `id` is used by any element, including group descendants.
    pub fn contains_id(&self, id: ElementId) -> bool {
        self.elements.iter().any(|e| {
            let mut hit = e.id == id;
            e.for_each_descendant(&mut |child| hit |= child.id == id);
            hit
        })
    }

    /// A copy without ephemeral elements, suitable for saving or snapshots.
    #[must_use]
    pub fn without_ephemeral(&self) -> Document {
        Document {
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            background: self.background,
            elements: self.elements.iter().filter(|e| !e.ephemeral).cloned().collect(),
            lineage: self.lineage,
            events: Vec::new(),
        }
    }

    // ─── Structural mutations ────────────────────────────────────────────

    /// Insert on top of the z-order. Returns the element's id.
    pub fn insert(&mut self, element: Element) -> Result<ElementId, ModelError> {
        let index = self.elements.len();
        self.insert_at(index, element)
    }

    /// Insert at `index` (clamped to the end). Bounded attributes are
    /// clamped the same way the JSON decoder clamps them.
    pub fn insert_at(&mut self, index: usize, mut element: Element) -> Result<ElementId, ModelError> {
        self.check_insertable(&element)?;
        element.normalize();
        let index = index.min(self.elements.len());
        let id = element.id;
        self.elements.insert(index, element);
        self.events.push(DocumentEvent::ElementAdded { id, index });
        Ok(id)
    }

    fn check_insertable(&self, element: &Element) -> Result<(), ModelError> {
        if let Some((id, field)) = element.non_finite() {
            return Err(ModelError::NonFinite { id, field });
        }
        if self.contains_id(element.id) {
            return Err(ModelError::DuplicateId(element.id));
        }
        let mut nested_dup = None;
        element.for_each_descendant(&mut |child| {
            if nested_dup.is_none() && (child.id == element.id || self.contains_id(child.id)) {
                nested_dup = Some(child.id);
            }
        });
        if let Some(id) = nested_dup {
            return Err(ModelError::DuplicateId(id));
        }
        if let Some(role) = element.nested_role() {
            return Err(ModelError::NestedRole(role));
        }
        if let Some(role) = element.role
            && self.element_with_role(role).is_some()
        {
            return Err(ModelError::DuplicateRole(role));
        }
        Ok(())
    }

    /// Remove an element by id.
    ///
    /// Unknown ids are a no-op (`Ok(None)`). A user delete of a placeholder is
    /// refused. Any other removal of a placeholder is followed by restoring the
    /// role at the same z-index and position.
    pub fn remove(&mut self, id: ElementId, origin: RemovalOrigin) -> Result<Option<Removal>, ModelError> {
        let Some(index) = self.index_of(id) else {
            return Ok(None);
        };
        if origin == RemovalOrigin::UserDelete {
            placeholder::check_removable(&self.elements[index])?;
        }
        let element = self.elements.remove(index);
        self.events.push(DocumentEvent::ElementRemoved {
            id,
            index,
            role: element.role,
        });
        let restored = placeholder::restore_removed(self, &element, index);
        Ok(Some(Removal {
            element,
            index,
            restored,
        }))
    }

    /// Remove every non-placeholder, non-ephemeral element. Placeholders keep
    /// their current geometry.
    pub fn clear(&mut self) -> Vec<Removal> {
        let doomed: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|e| !e.is_placeholder() && !e.ephemeral)
            .map(|e| e.id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.remove(id, RemovalOrigin::Structural).ok().flatten())
            .collect()
    }

    /// Move an element in the z-order. Returns true if the order changed.
    pub fn reorder(&mut self, id: ElementId, op: ZOrder) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let last = self.elements.len() - 1;
        let to = match op {
            ZOrder::Forward => (from + 1).min(last),
            ZOrder::Backward => from.saturating_sub(1),
            ZOrder::Front => last,
            ZOrder::Back => 0,
        };
        if to == from {
            return false;
        }
        let element = self.elements.remove(from);
        self.elements.insert(to, element);
        self.events.push(DocumentEvent::ElementModified {
            id,
            change: ChangeKind::Order,
        });
        true
    }

    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.reorder(id, ZOrder::Forward)
    }

    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.reorder(id, ZOrder::Backward)
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.reorder(id, ZOrder::Front)
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.reorder(id, ZOrder::Back)
    }

    /// Insert a deep copy of `id` offset by (`dx`, `dy`) on top of the
    /// z-order. Placeholders cannot be duplicated.
    pub fn duplicate(&mut self, id: ElementId, dx: f64, dy: f64) -> Result<ElementId, ModelError> {
        let source = self.get(id).ok_or(ModelError::UnknownElement(id))?;
        placeholder::check_duplicable(source)?;
        let mut copy = source.clone_with_fresh_ids();
        copy.x += dx;
        copy.y += dy;
        self.insert(copy)
    }

    // ─── Geometry / style mutations ──────────────────────────────────────

    /// Apply `edit` to a copy of the element and commit it if the id and role
    /// are untouched. On error the document is unchanged.
    pub fn modify(
        &mut self,
        id: ElementId,
        change: ChangeKind,
        edit: impl FnOnce(&mut Element),
    ) -> Result<(), ModelError> {
        let index = self.index_of(id).ok_or(ModelError::UnknownElement(id))?;
        let mut draft = self.elements[index].clone();
        edit(&mut draft);
        // ids are not editable
        draft.id = id;
        let current_role = self.elements[index].role;
        match (current_role, draft.role) {
            (Some(current), new) if new != Some(current) => {
                return Err(ModelError::RoleChangeForbidden(current));
            }
            (None, Some(new)) if self.element_with_role(new).is_some() => {
                return Err(ModelError::DuplicateRole(new));
            }
            _ => {}
        }
        if let Some(role) = draft.nested_role() {
            return Err(ModelError::NestedRole(role));
        }
        if let Some((id, field)) = draft.non_finite() {
            return Err(ModelError::NonFinite { id, field });
        }
        draft.normalize();
        self.elements[index] = draft;
        self.events.push(DocumentEvent::ElementModified { id, change });
        Ok(())
    }

    /// Assign a role to an element. Placeholders can never be re-roled, and
    /// each role can be held by one element only.
    pub fn set_role(&mut self, id: ElementId, role: Option<PlaceholderRole>) -> Result<(), ModelError> {
        let index = self.index_of(id).ok_or(ModelError::UnknownElement(id))?;
        let current = self.elements[index].role;
        if current == role {
            return Ok(());
        }
        if let Some(current) = current {
            return Err(ModelError::RoleChangeForbidden(current));
        }
        if let Some(role) = role {
            if self.element_with_role(role).is_some() {
                return Err(ModelError::DuplicateRole(role));
            }
            if let Some(nested) = self.elements[index].nested_role() {
                return Err(ModelError::NestedRole(nested));
            }
        }
        self.elements[index].role = role;
        self.events.push(DocumentEvent::ElementModified {
            id,
            change: ChangeKind::Style,
        });
        Ok(())
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.events.push(DocumentEvent::CanvasModified {
                change: ChangeKind::Style,
            });
        }
    }

    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<(), ModelError> {
        if width == 0 || height == 0 {
            return Err(ModelError::InvalidCanvasSize { width, height });
        }
        if (width, height) != (self.canvas_width, self.canvas_height) {
            self.canvas_width = width;
            self.canvas_height = height;
            self.events.push(DocumentEvent::CanvasModified {
                change: ChangeKind::CanvasSize,
            });
        }
        Ok(())
    }

    // ─── Whole-document replacement ──────────────────────────────────────

    /// Overwrite the contents in place from a history snapshot. The lineage
    /// is kept. No events are recorded.
    pub fn restore_from(&mut self, snapshot: Document) {
        self.canvas_width = snapshot.canvas_width;
        self.canvas_height = snapshot.canvas_height;
        self.background = snapshot.background;
        self.elements = snapshot.elements;
        self.events.clear();
    }

    /// Replace this document wholesale (template load, template switch). The
    /// incoming lineage is adopted, which invalidates any history recorded
    /// against the old one. No events are recorded.
    pub fn replace(&mut self, other: Document) {
        *self = Document {
            events: Vec::new(),
            ..other
        };
    }

    /// Give this document a new lineage, as if freshly loaded.
    pub fn detach_lineage(&mut self) {
        self.lineage = next_lineage();
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Build a document directly from parts, bypassing role checks. Callers
    /// are responsible for the one-element-per-role invariant.
    pub(crate) fn from_parts(canvas_width: u32, canvas_height: u32, background: Color, elements: Vec<Element>) -> Self {
        Self {
            canvas_width,
            canvas_height,
            background,
            elements,
            lineage: next_lineage(),
            events: Vec::new(),
        }
    }
}
