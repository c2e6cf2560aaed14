//! Issuance-time bindings.
//!
//! The issuance renderer lives elsewhere. It asks the document which element
//! stands for each role and replaces that element with learner data. Nothing
//! here performs the substitution.

use crate::id::ElementId;
use crate::model::{Document, PlaceholderRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-learner values handed to the issuance renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderValues {
    pub student_name: String,
    pub course_title: String,
    pub issue_date: String,
    /// A data URL of the rendered QR code.
    pub qr_image: String,
    pub verification_url: String,
}

impl PlaceholderValues {
    pub fn get(&self, role: PlaceholderRole) -> &str {
        match role {
            PlaceholderRole::StudentName => &self.student_name,
            PlaceholderRole::CourseTitle => &self.course_title,
            PlaceholderRole::IssueDate => &self.issue_date,
            PlaceholderRole::QrCode => &self.qr_image,
            PlaceholderRole::VerificationUrl => &self.verification_url,
        }
    }
}

/// Role → element id for every placeholder present, in role order.
pub fn placeholder_bindings(doc: &Document) -> BTreeMap<PlaceholderRole, ElementId> {
    doc.elements()
        .iter()
        .filter_map(|e| e.role.map(|role| (role, e.id)))
        .collect()
}
