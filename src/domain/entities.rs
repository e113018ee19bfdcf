//! Domain entities: core data structures

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::Diagnostic;

/// Unique identifier of a member document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for MemberId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Lenient parse: anything that is not male/female is unknown.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("male") | Some("m") => Gender::Male,
            Some("female") | Some("f") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

/// Kind of a relationship pointer.
///
/// On a member, the kind describes the member's relation *to* its `related_to`
/// target: a member with `Child` pointing at `p` is a child of `p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Parent,
    Child,
    Spouse,
    Sibling,
}

impl RelationshipKind {
    /// Relation seen from the other end of the pointer.
    pub fn inverse(self) -> Self {
        match self {
            RelationshipKind::Parent => RelationshipKind::Child,
            RelationshipKind::Child => RelationshipKind::Parent,
            RelationshipKind::Spouse => RelationshipKind::Spouse,
            RelationshipKind::Sibling => RelationshipKind::Sibling,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Parent => "parent",
            RelationshipKind::Child => "child",
            RelationshipKind::Spouse => "spouse",
            RelationshipKind::Sibling => "sibling",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(RelationshipKind::Parent),
            "child" => Ok(RelationshipKind::Child),
            "spouse" => Ok(RelationshipKind::Spouse),
            "sibling" => Ok(RelationshipKind::Sibling),
            other => Err(other.to_string()),
        }
    }
}

/// A typed relationship pointer: `kind` of `related_to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub kind: RelationshipKind,
    pub related_to: MemberId,
}

/// A person in the family tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    /// Account linked to this profile
    pub user_id: Option<String>,
    pub relation: Option<Relation>,
}

impl Member {
    /// Minimal member without relation, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<MemberId>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: String::new(),
            gender: Gender::Unknown,
            birth_date: None,
            death_date: None,
            photo_url: None,
            user_id: None,
            relation: None,
        }
    }

    pub fn with_relation(mut self, kind: RelationshipKind, related_to: impl Into<MemberId>) -> Self {
        self.relation = Some(Relation {
            kind,
            related_to: related_to.into(),
        });
        self
    }

    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn relationship(&self) -> Option<RelationshipKind> {
        self.relation.as_ref().map(|r| r.kind)
    }

    pub fn related_to(&self) -> Option<&MemberId> {
        self.relation.as_ref().map(|r| &r.related_to)
    }

    /// True if this member points at `target` with the given kind.
    pub fn points_at(&self, kind: RelationshipKind, target: &str) -> bool {
        self.relation
            .as_ref()
            .is_some_and(|r| r.kind == kind && r.related_to.as_str() == target)
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    /// Convert back to the document shape used at the persistence boundary.
    pub fn to_record(&self) -> MemberRecord {
        MemberRecord {
            id: Some(self.id.to_string()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            gender: Some(self.gender.as_str().to_string()),
            birth_date: self.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            death_date: self.death_date.map(|d| d.format("%Y-%m-%d").to_string()),
            photo_url: self.photo_url.clone(),
            user_id: self.user_id.clone(),
            relationship: self.relationship().map(|k| k.as_str().to_string()),
            related_to: self.related_to().map(|id| id.to_string()),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())?;
        if let Some(date) = self.birth_date {
            write!(f, " (b. {})", date.format("%Y"))?;
        }
        Ok(())
    }
}

/// One member document as stored by the persistence layer.
///
/// Every field is optional: documents are user-entered and frequently incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_to: Option<String>,
}

/// Outcome of validating a single record.
pub type RecordOutcome = Result<(Member, Vec<Diagnostic>), Diagnostic>;

impl MemberRecord {
    /// Validate a document into a [`Member`].
    ///
    /// Missing `id` or `firstName` rejects the record. Everything else degrades:
    /// broken relations are dropped and bad dates become undated, each with a warning.
    pub fn into_member(self, position: usize) -> RecordOutcome {
        let id = match non_blank(self.id) {
            Some(id) => MemberId::from(id),
            None => {
                return Err(Diagnostic::InvalidRecord {
                    position,
                    reason: "missing id".to_string(),
                })
            }
        };
        let first_name = match non_blank(self.first_name) {
            Some(name) => name,
            None => {
                return Err(Diagnostic::InvalidRecord {
                    position,
                    reason: format!("member {id} has no firstName"),
                })
            }
        };

        let mut warnings = Vec::new();

        let relation = match (non_blank(self.relationship), non_blank(self.related_to)) {
            (None, None) => None,
            (Some(kind), Some(target)) => match kind.parse::<RelationshipKind>() {
                Ok(kind) => Some(Relation {
                    kind,
                    related_to: MemberId::from(target),
                }),
                Err(value) => {
                    warnings.push(Diagnostic::UnknownRelationship {
                        member: id.clone(),
                        value,
                    });
                    None
                }
            },
            _ => {
                warnings.push(Diagnostic::IncompleteRelation { member: id.clone() });
                None
            }
        };

        let birth_date = parse_date_field(&id, "birthDate", self.birth_date, &mut warnings);
        let death_date = parse_date_field(&id, "deathDate", self.death_date, &mut warnings);

        let member = Member {
            id,
            first_name,
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
            gender: Gender::parse(self.gender.as_deref()),
            birth_date,
            death_date,
            photo_url: non_blank(self.photo_url),
            user_id: non_blank(self.user_id),
            relation,
        };
        Ok((member, warnings))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date_field(
    id: &MemberId,
    field: &'static str,
    value: Option<String>,
    warnings: &mut Vec<Diagnostic>,
) -> Option<NaiveDate> {
    let value = non_blank(value)?;
    match parse_date(&value) {
        Some(date) => Some(date),
        None => {
            warnings.push(Diagnostic::InvalidDate {
                member: id.clone(),
                field,
                value,
            });
            None
        }
    }
}

/// Parse an ISO date (`YYYY-MM-DD`) or the date part of an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, first: &str) -> MemberRecord {
        MemberRecord {
            id: Some(id.to_string()),
            first_name: Some(first.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn given_complete_record_when_validating_then_builds_member() {
        let rec = MemberRecord {
            last_name: Some("Joseph".into()),
            gender: Some("Female".into()),
            birth_date: Some("1950-04-02".into()),
            relationship: Some("spouse".into()),
            related_to: Some("p1".into()),
            ..record("m1", "Marie")
        };

        let (member, warnings) = rec.into_member(0).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(member.id.as_str(), "m1");
        assert_eq!(member.gender, Gender::Female);
        assert_eq!(member.birth_date, NaiveDate::from_ymd_opt(1950, 4, 2));
        assert_eq!(member.relationship(), Some(RelationshipKind::Spouse));
        assert_eq!(member.related_to().map(MemberId::as_str), Some("p1"));
        assert_eq!(member.full_name(), "Marie Joseph");
    }

    #[test]
    fn given_missing_id_when_validating_then_rejects() {
        let rec = MemberRecord {
            first_name: Some("Anon".into()),
            ..Default::default()
        };
        let err = rec.into_member(3).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRecord { position: 3, .. }));
    }

    #[test]
    fn given_blank_first_name_when_validating_then_rejects() {
        let err = record("m1", "   ").into_member(0).unwrap_err();
        assert!(err.to_string().contains("firstName"));
    }

    #[test]
    fn given_relationship_without_target_when_validating_then_drops_relation() {
        let rec = MemberRecord {
            relationship: Some("child".into()),
            ..record("m1", "Jean")
        };
        let (member, warnings) = rec.into_member(0).unwrap();
        assert!(member.relation.is_none());
        assert_eq!(
            warnings,
            vec![Diagnostic::IncompleteRelation {
                member: MemberId::from("m1")
            }]
        );
    }

    #[test]
    fn given_unknown_relationship_when_validating_then_warns() {
        let rec = MemberRecord {
            relationship: Some("cousin".into()),
            related_to: Some("x".into()),
            ..record("m1", "Jean")
        };
        let (member, warnings) = rec.into_member(0).unwrap();
        assert!(member.relation.is_none());
        assert!(matches!(
            &warnings[0],
            Diagnostic::UnknownRelationship { value, .. } if value == "cousin"
        ));
    }

    #[test]
    fn given_bad_birth_date_when_validating_then_member_is_undated() {
        let rec = MemberRecord {
            birth_date: Some("12/05/1980".into()),
            ..record("m1", "Jean")
        };
        let (member, warnings) = rec.into_member(0).unwrap();
        assert!(member.birth_date.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn given_rfc3339_timestamp_when_parsing_date_then_uses_date_part() {
        assert_eq!(
            parse_date("1988-11-23T10:00:00Z"),
            NaiveDate::from_ymd_opt(1988, 11, 23)
        );
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn given_member_when_converted_to_record_then_roundtrips() {
        let member = Member::new("c1", "Ti")
            .with_relation(RelationshipKind::Child, "m1")
            .with_birth_date(NaiveDate::from_ymd_opt(2001, 1, 9).unwrap());
        let (back, warnings) = member.to_record().into_member(0).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(back, member);
    }

    #[test]
    fn given_kinds_when_inverting_then_parent_child_swap() {
        assert_eq!(RelationshipKind::Parent.inverse(), RelationshipKind::Child);
        assert_eq!(RelationshipKind::Child.inverse(), RelationshipKind::Parent);
        assert_eq!(RelationshipKind::Spouse.inverse(), RelationshipKind::Spouse);
        assert_eq!(RelationshipKind::Sibling.inverse(), RelationshipKind::Sibling);
    }
}
