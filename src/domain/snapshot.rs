//! Validated member snapshot handed to the core on every build.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::entities::{Member, MemberRecord, RecordOutcome};
use crate::domain::error::{Diagnostic, DomainError, DomainResult};

/// Accepted shapes of a snapshot document.
///
/// Elements stay untyped here so one malformed member cannot reject the rest.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    List(Vec<Value>),
    Wrapped { members: Vec<Value> },
}

/// Members that passed validation, in input order, plus what was found on the way.
#[derive(Debug, Clone, Default)]
pub struct FamilySnapshot {
    pub members: Vec<Member>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FamilySnapshot {
    /// Validate records one by one; rejected records are reported, not fatal.
    pub fn from_records(records: Vec<MemberRecord>) -> Self {
        Self::collect(
            records
                .into_iter()
                .enumerate()
                .map(|(position, record)| record.into_member(position)),
        )
    }

    /// Parse a JSON array of member documents, or an object with a `members` array.
    ///
    /// Only an unreadable document fails. An element that is not a member
    /// document (wrong field types, not an object) becomes `InvalidRecord`.
    pub fn from_json(content: &str) -> DomainResult<Self> {
        let document: SnapshotDocument =
            serde_json::from_str(content).map_err(|e| DomainError::InvalidSnapshot {
                message: e.to_string(),
            })?;
        let values = match document {
            SnapshotDocument::List(values) => values,
            SnapshotDocument::Wrapped { members } => members,
        };

        Ok(Self::collect(values.into_iter().enumerate().map(
            |(position, value)| {
                serde_json::from_value::<MemberRecord>(value)
                    .map_err(|e| Diagnostic::InvalidRecord {
                        position,
                        reason: format!("malformed member document: {e}"),
                    })
                    .and_then(|record| record.into_member(position))
            },
        )))
    }

    fn collect(outcomes: impl Iterator<Item = RecordOutcome>) -> Self {
        let mut members = Vec::new();
        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok((member, warnings)) => {
                    diagnostics.extend(warnings);
                    members.push(member);
                }
                Err(rejected) => diagnostics.push(rejected),
            }
        }
        Self {
            members,
            diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_array_document_when_parsing_then_keeps_valid_members() {
        let json = r#"[
            {"id": "a", "firstName": "Ann"},
            {"firstName": "NoId"},
            {"id": "b", "firstName": "Bob", "relationship": "child", "relatedTo": "a"}
        ]"#;

        let snapshot = FamilySnapshot::from_json(json).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.diagnostics.len(), 1);
        assert!(matches!(
            snapshot.diagnostics[0],
            Diagnostic::InvalidRecord { position: 1, .. }
        ));
    }

    #[test]
    fn given_wrapped_document_when_parsing_then_reads_members_key() {
        let json = r#"{"members": [{"id": "a", "firstName": "Ann", "extra": 1}]}"#;
        let snapshot = FamilySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.diagnostics.is_empty());
    }

    #[test]
    fn given_mistyped_field_when_parsing_then_only_that_record_rejected() {
        // Arrange
        let json = r#"[
            {"id": "mom", "firstName": "Mom"},
            {"id": "kid", "firstName": "Kid", "relationship": "child", "relatedTo": "mom"},
            {"id": "x", "firstName": "X", "birthDate": 1950},
            "not a member"
        ]"#;

        // Act
        let snapshot = FamilySnapshot::from_json(json).unwrap();

        // Assert
        let ids: Vec<&str> = snapshot.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["mom", "kid"]);
        assert_eq!(snapshot.diagnostics.len(), 2);
        match &snapshot.diagnostics[0] {
            Diagnostic::InvalidRecord { position, reason } => {
                assert_eq!(*position, 2);
                assert!(reason.contains("malformed member document"), "{reason}");
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
        assert!(matches!(
            snapshot.diagnostics[1],
            Diagnostic::InvalidRecord { position: 3, .. }
        ));
    }

    #[test]
    fn given_malformed_json_when_parsing_then_errors() {
        let result = FamilySnapshot::from_json("{not json");
        assert!(matches!(result, Err(DomainError::InvalidSnapshot { .. })));
    }
}
