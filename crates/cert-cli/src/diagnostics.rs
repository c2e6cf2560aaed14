//! Diagnostics: decode warnings and lint findings → terminal lines.

use cert_core::codec::CodecWarning;
use cert_core::{LintDiagnostic, LintSeverity};

/// One printable line per lint finding, e.g.
/// `error[missing-role]: no element holds the QR_CODE placeholder`.
pub fn format_lint(diag: &LintDiagnostic) -> String {
    let severity = match diag.severity {
        LintSeverity::Error => "error",
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "info",
    };
    match diag.element {
        Some(id) => format!("{severity}[{}]: {} ({id})", diag.rule, diag.message),
        None => format!("{severity}[{}]: {}", diag.rule, diag.message),
    }
}

pub fn format_warning(warning: &CodecWarning) -> String {
    match warning {
        CodecWarning::DroppedElement { path, reason } => format!("repair: dropped {path}: {reason}"),
        CodecWarning::DefaultedField { path, field } => format!("repair: {path}.{field} reset to default"),
        CodecWarning::DemotedRole { path, role } => format!("repair: {path} no longer holds role {role}"),
        CodecWarning::RegeneratedId { path } => format!("repair: {path} was given a new id"),
        CodecWarning::SynthesizedPlaceholder { role } => format!("repair: added missing {role} placeholder"),
    }
}

/// Count of (errors, warnings) among lint findings.
pub fn tally(diags: &[LintDiagnostic]) -> (usize, usize) {
    diags.iter().fold((0, 0), |(e, w), d| match d.severity {
        LintSeverity::Error => (e + 1, w),
        LintSeverity::Warning => (e, w + 1),
        LintSeverity::Info => (e, w),
    })
}
