//! Selection → editable property set.
//!
//! A [`PropertyView`] is what the inspector panel shows for the selected
//! element; a [`PropertyEdit`] is one write coming back from it. Every view
//! carries the common geometry. Text and shapes add their own groups.
//! Placeholders show their role read-only and hide nothing.

use crate::error::EditError;
use cert_core::id::ElementId;
use cert_core::model::{
    ChangeKind, Color, Element, ElementKind, FONT_WEIGHT_MAX, FONT_WEIGHT_MIN, FontStyle, PlaceholderRole, ShapeKind,
    TextAlign,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryProperties {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperties {
    pub content: String,
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub underline: bool,
    pub align: TextAlign,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProperties {
    pub shape: ShapeKind,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    /// `None` when the shape has no corners to round.
    pub corner_radius: Option<f64>,
}

/// The inspector's view of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    pub id: ElementId,
    pub kind: &'static str,
    /// Shown with a lock affordance; never editable.
    pub role: Option<PlaceholderRole>,
    pub geometry: GeometryProperties,
    pub text: Option<TextProperties>,
    pub shape: Option<ShapeProperties>,
}

impl PropertyView {
    pub fn of(element: &Element) -> Self {
        let text = match &element.kind {
            ElementKind::Text(t) => Some(TextProperties {
                content: t.content.clone(),
                font_family: t.style.font_family.clone(),
                font_size: t.style.font_size,
                font_weight: t.style.font_weight,
                font_style: t.style.font_style,
                underline: t.style.underline,
                align: t.style.align,
                color: t.style.color,
            }),
            _ => None,
        };
        let shape = match &element.kind {
            ElementKind::Shape(s) => Some(ShapeProperties {
                shape: s.shape,
                fill: s.fill,
                stroke: s.stroke,
                stroke_width: s.stroke_width,
                corner_radius: s.shape.supports_corner_radius().then_some(s.corner_radius),
            }),
            _ => None,
        };
        Self {
            id: element.id,
            kind: element.kind.name(),
            role: element.role,
            geometry: GeometryProperties {
                x: element.x,
                y: element.y,
                width: element.width,
                height: element.height,
                rotation: element.rotation,
                opacity: element.opacity,
            },
            text,
            shape,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.role.is_some()
    }
}

/// One property write. Applied immediately; checkpointed on the next commit.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEdit {
    X(f64),
    Y(f64),
    Width(f64),
    Height(f64),
    Rotation(f64),
    Opacity(f64),
    Content(String),
    FontFamily(String),
    FontSize(f64),
    FontWeight(u16),
    FontStyle(FontStyle),
    Underline(bool),
    Align(TextAlign),
    TextColor(Color),
    Fill(Option<Color>),
    Stroke(Option<Color>),
    StrokeWidth(f64),
    CornerRadius(f64),
}

impl PropertyEdit {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyEdit::X(_) => "x",
            PropertyEdit::Y(_) => "y",
            PropertyEdit::Width(_) => "width",
            PropertyEdit::Height(_) => "height",
            PropertyEdit::Rotation(_) => "rotation",
            PropertyEdit::Opacity(_) => "opacity",
            PropertyEdit::Content(_) => "text",
            PropertyEdit::FontFamily(_) => "font family",
            PropertyEdit::FontSize(_) => "font size",
            PropertyEdit::FontWeight(_) => "font weight",
            PropertyEdit::FontStyle(_) => "font style",
            PropertyEdit::Underline(_) => "underline",
            PropertyEdit::Align(_) => "alignment",
            PropertyEdit::TextColor(_) => "text color",
            PropertyEdit::Fill(_) => "fill",
            PropertyEdit::Stroke(_) => "stroke",
            PropertyEdit::StrokeWidth(_) => "stroke width",
            PropertyEdit::CornerRadius(_) => "corner radius",
        }
    }

    pub fn change_kind(&self) -> ChangeKind {
        match self {
            PropertyEdit::X(_)
            | PropertyEdit::Y(_)
            | PropertyEdit::Width(_)
            | PropertyEdit::Height(_)
            | PropertyEdit::Rotation(_) => ChangeKind::Geometry,
            PropertyEdit::Content(_) => ChangeKind::Content,
            _ => ChangeKind::Style,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match *self {
            PropertyEdit::X(v)
            | PropertyEdit::Y(v)
            | PropertyEdit::Width(v)
            | PropertyEdit::Height(v)
            | PropertyEdit::Rotation(v)
            | PropertyEdit::Opacity(v)
            | PropertyEdit::FontSize(v)
            | PropertyEdit::StrokeWidth(v)
            | PropertyEdit::CornerRadius(v) => Some(v),
            PropertyEdit::FontWeight(w) => Some(w as f64),
            _ => None,
        }
    }

    /// Whether this edit can be applied to `element`, and whether its value
    /// is acceptable.
    pub fn check(&self, element: &Element) -> Result<(), EditError> {
        let not_applicable = || EditError::NotApplicable {
            property: self.name(),
            kind: element.kind.name(),
        };
        match (self, &element.kind) {
            (
                PropertyEdit::Content(_)
                | PropertyEdit::FontFamily(_)
                | PropertyEdit::FontSize(_)
                | PropertyEdit::FontWeight(_)
                | PropertyEdit::FontStyle(_)
                | PropertyEdit::Underline(_)
                | PropertyEdit::Align(_)
                | PropertyEdit::TextColor(_),
                ElementKind::Text(_),
            ) => {}
            (
                PropertyEdit::Fill(_) | PropertyEdit::Stroke(_) | PropertyEdit::StrokeWidth(_),
                ElementKind::Shape(_),
            ) => {}
            (PropertyEdit::CornerRadius(_), ElementKind::Shape(s)) if s.shape.supports_corner_radius() => {}
            (
                PropertyEdit::X(_)
                | PropertyEdit::Y(_)
                | PropertyEdit::Width(_)
                | PropertyEdit::Height(_)
                | PropertyEdit::Rotation(_)
                | PropertyEdit::Opacity(_),
                _,
            ) => {}
            _ => return Err(not_applicable()),
        }

        if let Some(value) = self.numeric() {
            let ok = match self {
                PropertyEdit::X(_) | PropertyEdit::Y(_) | PropertyEdit::Rotation(_) => value.is_finite(),
                PropertyEdit::Opacity(_) => (0.0..=1.0).contains(&value),
                PropertyEdit::FontSize(_) => value.is_finite() && value > 0.0,
                PropertyEdit::FontWeight(_) => {
                    (f64::from(FONT_WEIGHT_MIN)..=f64::from(FONT_WEIGHT_MAX)).contains(&value)
                }
                _ => value.is_finite() && value >= 0.0,
            };
            if !ok {
                return Err(EditError::InvalidValue {
                    property: self.name(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Write the value into `element`. Call [`PropertyEdit::check`] first;
    /// edits that do not apply are ignored here.
    pub fn apply(&self, element: &mut Element) {
        match (self, &mut element.kind) {
            (PropertyEdit::X(v), _) => element.x = *v,
            (PropertyEdit::Y(v), _) => element.y = *v,
            (PropertyEdit::Width(v), _) => element.width = *v,
            (PropertyEdit::Height(v), _) => element.height = *v,
            (PropertyEdit::Rotation(v), _) => element.rotation = v.rem_euclid(360.0),
            (PropertyEdit::Opacity(v), _) => element.opacity = *v,
            (PropertyEdit::Content(v), ElementKind::Text(t)) => t.content = v.clone(),
            (PropertyEdit::FontFamily(v), ElementKind::Text(t)) => t.style.font_family = v.clone(),
            (PropertyEdit::FontSize(v), ElementKind::Text(t)) => t.style.font_size = *v,
            (PropertyEdit::FontWeight(v), ElementKind::Text(t)) => t.style.font_weight = *v,
            (PropertyEdit::FontStyle(v), ElementKind::Text(t)) => t.style.font_style = *v,
            (PropertyEdit::Underline(v), ElementKind::Text(t)) => t.style.underline = *v,
            (PropertyEdit::Align(v), ElementKind::Text(t)) => t.style.align = *v,
            (PropertyEdit::TextColor(v), ElementKind::Text(t)) => t.style.color = *v,
            (PropertyEdit::Fill(v), ElementKind::Shape(s)) => s.fill = *v,
            (PropertyEdit::Stroke(v), ElementKind::Shape(s)) => s.stroke = *v,
            (PropertyEdit::StrokeWidth(v), ElementKind::Shape(s)) => s.stroke_width = *v,
            (PropertyEdit::CornerRadius(v), ElementKind::Shape(s)) => s.corner_radius = *v,
            _ => {}
        }
    }
}
