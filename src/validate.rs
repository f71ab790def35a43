//
// validate.rs
// XNAT-RTStruct-rs
//
// Classifies every tag read/write against its DICOM requirement type and accumulates the resulting errors and warnings.
//

use std::fmt;

use dicom::core::Tag;
use serde::Serialize;

/// DICOM presence rule attached to a field ("type" in PS3.3 module tables).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Requirement {
    /// Type 1: must be present with a valid, non-empty value.
    Required,
    /// Type 1C: as Type 1 whenever the owning entity decides the condition holds.
    RequiredConditional,
    /// Type 2: must be present, may be empty.
    RequiredAllowEmpty,
    /// Type 2C: as Type 2 whenever the owning entity decides the condition holds.
    RequiredAllowEmptyConditional,
    /// Type 3: absence is only worth a warning.
    Optional,
    /// No longer part of the standard; presence is worth a warning.
    Retired,
}

impl Requirement {
    /// Whether a zero-length value satisfies the rule.
    pub fn allows_empty(self) -> bool {
        !matches!(
            self,
            Requirement::Required | Requirement::RequiredConditional
        )
    }
}

/// Result of classifying one read or write.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Ok,
    FatalMissing,
    FatalInvalid,
    WarnMissingOptional,
    WarnRetiredPresent,
}

/// Map (presence, validity, requirement) to exactly one outcome.
///
/// Each requirement type is handled by its own arm; there is no shared
/// fall-through between the required, optional and retired rules.
pub fn classify(present: bool, valid: bool, requirement: Requirement) -> Outcome {
    match requirement {
        Requirement::Required
        | Requirement::RequiredConditional
        | Requirement::RequiredAllowEmpty
        | Requirement::RequiredAllowEmptyConditional => match (present, valid) {
            (false, _) => Outcome::FatalMissing,
            (true, false) => Outcome::FatalInvalid,
            (true, true) => Outcome::Ok,
        },
        Requirement::Optional => match (present, valid) {
            (false, _) => Outcome::WarnMissingOptional,
            (true, false) => Outcome::FatalInvalid,
            (true, true) => Outcome::Ok,
        },
        Requirement::Retired => {
            if present {
                Outcome::WarnRetiredPresent
            } else {
                Outcome::Ok
            }
        }
    }
}

/// One error or warning, tied to the entity that produced it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub entity: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

/// Errors and warnings gathered while decoding or encoding an entity and its descendants.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error(&mut self, entity: &str, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(entity, message));
    }

    pub fn warning(&mut self, entity: &str, message: impl Into<String>) {
        let warning = Diagnostic::new(entity, message);
        // Repeated items (thousands of contour images) would otherwise flood the report.
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Record the outcome of one classified field access.
    pub fn record(&mut self, entity: &str, keyword: &str, tag: Tag, outcome: Outcome) {
        let tag = format_tag(tag);
        match outcome {
            Outcome::Ok => {}
            Outcome::FatalMissing => self.error(entity, format!("{keyword} {tag} is required but absent")),
            Outcome::FatalInvalid => {
                self.error(entity, format!("{keyword} {tag} has invalid tag contents"))
            }
            Outcome::WarnMissingOptional => {
                self.warning(entity, format!("optional {keyword} {tag} is absent"))
            }
            Outcome::WarnRetiredPresent => {
                self.warning(entity, format!("retired {keyword} {tag} is present"))
            }
        }
    }

    /// Flatten a child's diagnostics into this list.
    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        for warning in other.warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

pub fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}
