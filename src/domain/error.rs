//! Domain-level errors and non-fatal diagnostics (no external dependencies)

use thiserror::Error;

use crate::domain::entities::MemberId;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("invalid view mode: {0} (expected full, ancestors, descendants or hourglass)")]
    InvalidViewMode(String),

    #[error("invalid member snapshot: {message}")]
    InvalidSnapshot { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// How loudly a diagnostic should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// Data-quality findings that never abort a build.
///
/// The core always renders what is valid and reports the rest through these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("record #{position} rejected: {reason}")]
    InvalidRecord { position: usize, reason: String },

    #[error("member {member}: relationship and relatedTo must be set together, relation ignored")]
    IncompleteRelation { member: MemberId },

    #[error("member {member}: unknown relationship '{value}', relation ignored")]
    UnknownRelationship { member: MemberId, value: String },

    #[error("member {member}: unparsable {field} '{value}', treated as undated")]
    InvalidDate {
        member: MemberId,
        field: &'static str,
        value: String,
    },

    #[error("duplicate member id {member}: later record replaces earlier one")]
    DuplicateId { member: MemberId },

    #[error("member {member} already placed, skipped under {parent}")]
    AlreadyPlaced { member: MemberId, parent: MemberId },

    #[error("relationship cycle: {}", format_ids(.members))]
    CycleDetected { members: Vec<MemberId> },

    #[error("member {member} could not be placed in any tree (anchored to {anchor})")]
    Unplaced { member: MemberId, anchor: MemberId },

    #[error("generation limit {limit} reached below {member}, descendants not expanded")]
    DepthLimitReached { member: MemberId, limit: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::AlreadyPlaced { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Member the diagnostic is about, if it concerns a single accepted member.
    pub fn member(&self) -> Option<&MemberId> {
        match self {
            Diagnostic::IncompleteRelation { member }
            | Diagnostic::UnknownRelationship { member, .. }
            | Diagnostic::InvalidDate { member, .. }
            | Diagnostic::DuplicateId { member }
            | Diagnostic::AlreadyPlaced { member, .. }
            | Diagnostic::Unplaced { member, .. }
            | Diagnostic::DepthLimitReached { member, .. } => Some(member),
            Diagnostic::InvalidRecord { .. } | Diagnostic::CycleDetected { .. } => None,
        }
    }
}

fn format_ids(ids: &[MemberId]) -> String {
    ids.iter()
        .map(MemberId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
