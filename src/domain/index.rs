//! Relationship index: id lookup and typed adjacency over a member snapshot.
//!
//! Built once per snapshot so that spouse, child and path lookups are
//! table reads instead of repeated scans of the member list.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::entities::{Member, MemberId, RelationshipKind};
use crate::domain::error::Diagnostic;

/// Typed edge in the relationship graph.
///
/// `kind` describes the target relative to the source: an edge with kind
/// `Parent` leads from a person to one of their parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: usize,
    pub kind: RelationshipKind,
}

/// Lookup structures over a flat member list.
///
/// Members are addressed by position (first-occurrence order of their id).
#[derive(Debug, Clone, Default)]
pub struct RelationshipIndex {
    members: Vec<Member>,
    positions: HashMap<MemberId, usize>,
    edges: Vec<Vec<Edge>>,
    spouse_claims: Vec<Vec<usize>>,
    child_claims: Vec<Vec<usize>>,
    parent_claims: Vec<Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl RelationshipIndex {
    /// Index a member list.
    ///
    /// Duplicate ids: the later record replaces the earlier one but keeps its
    /// position; every replacement is reported as [`Diagnostic::DuplicateId`].
    #[instrument(level = "debug", skip(members), fields(count = members.len()))]
    pub fn build(members: &[Member]) -> Self {
        let mut unique: Vec<Member> = Vec::with_capacity(members.len());
        let mut positions: HashMap<MemberId, usize> = HashMap::with_capacity(members.len());
        let mut diagnostics = Vec::new();

        for member in members {
            match positions.get(&member.id) {
                Some(&pos) => {
                    diagnostics.push(Diagnostic::DuplicateId {
                        member: member.id.clone(),
                    });
                    unique[pos] = member.clone();
                }
                None => {
                    positions.insert(member.id.clone(), unique.len());
                    unique.push(member.clone());
                }
            }
        }

        let n = unique.len();
        let mut claims: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut spouse_claims: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut child_claims: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut parent_claims: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut direct: Vec<Option<usize>> = vec![None; n];

        for (pos, member) in unique.iter().enumerate() {
            let Some(relation) = &member.relation else {
                continue;
            };
            let Some(&target) = positions.get(&relation.related_to) else {
                continue;
            };
            if target == pos {
                continue;
            }
            direct[pos] = Some(target);
            claims[target].push(pos);
            match relation.kind {
                RelationshipKind::Spouse => spouse_claims[target].push(pos),
                RelationshipKind::Child => child_claims[target].push(pos),
                RelationshipKind::Parent => parent_claims[target].push(pos),
                RelationshipKind::Sibling => {}
            }
        }

        // Order edges the way a scan over the member list would meet them:
        // by position of the other end, own pointer before the inverse one.
        let edges = (0..n)
            .map(|pos| {
                let mut keyed: Vec<(usize, u8, Edge)> = claims[pos]
                    .iter()
                    .filter_map(|&other| {
                        unique[other].relationship().map(|kind| {
                            (other, 1, Edge { target: other, kind })
                        })
                    })
                    .collect();
                if let (Some(target), Some(kind)) = (direct[pos], unique[pos].relationship()) {
                    keyed.push((
                        target,
                        0,
                        Edge {
                            target,
                            kind: kind.inverse(),
                        },
                    ));
                }
                keyed.sort_by_key(|(other, order, _)| (*other, *order));
                keyed.into_iter().map(|(_, _, edge)| edge).collect()
            })
            .collect();

        debug!(members = n, duplicates = diagnostics.len(), "index built");

        Self {
            members: unique,
            positions,
            edges,
            spouse_claims,
            child_claims,
            parent_claims,
            diagnostics,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Member> {
        self.position(id).map(|pos| &self.members[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn member_at(&self, pos: usize) -> &Member {
        &self.members[pos]
    }

    /// Members in first-occurrence order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Position of the member's `related_to` target, if it resolves to someone else.
    pub fn related_position(&self, pos: usize) -> Option<usize> {
        self.members[pos]
            .related_to()
            .and_then(|id| self.position(id.as_str()))
            .filter(|&target| target != pos)
    }

    /// All edges of a member, in scan order.
    pub fn edges(&self, pos: usize) -> &[Edge] {
        &self.edges[pos]
    }

    /// Members whose `spouse` pointer targets `pos`, in input order.
    pub fn spouse_claims(&self, pos: usize) -> &[usize] {
        &self.spouse_claims[pos]
    }

    /// Members whose `child` pointer targets `pos`, in input order.
    pub fn child_claims(&self, pos: usize) -> &[usize] {
        &self.child_claims[pos]
    }

    /// Members whose `parent` pointer targets `pos`, in input order.
    pub fn parent_claims(&self, pos: usize) -> &[usize] {
        &self.parent_claims[pos]
    }

    /// Spouses in either pointer direction, without duplicates.
    pub fn spouses_of(&self, pos: usize) -> Vec<usize> {
        let mut spouses: Vec<usize> = Vec::new();
        for edge in &self.edges[pos] {
            if edge.kind == RelationshipKind::Spouse && !spouses.contains(&edge.target) {
                spouses.push(edge.target);
            }
        }
        spouses
    }

    /// Number of other members linked by a parent, child or spouse pointer in either direction.
    pub fn connection_count(&self, pos: usize) -> usize {
        let own = self.members[pos].relation.as_ref().filter(|r| {
            r.kind != RelationshipKind::Sibling
                && self
                    .position(r.related_to.as_str())
                    .is_some_and(|target| target != pos)
        });
        self.spouse_claims[pos].len()
            + self.child_claims[pos].len()
            + self.parent_claims[pos].len()
            + usize::from(own.is_some())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Index a member list (function form of [`RelationshipIndex::build`]).
pub fn build_index(members: &[Member]) -> RelationshipIndex {
    RelationshipIndex::build(members)
}
