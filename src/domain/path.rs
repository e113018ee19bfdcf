//! Relationship paths between two members and the labels derived from them.

use std::collections::VecDeque;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::entities::{Member, MemberId, RelationshipKind};
use crate::domain::error::DomainResult;
use crate::domain::views::FamilyGraph;

/// One hop of a relationship path: `to` is the `kind` of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub from: MemberId,
    pub to: MemberId,
    pub kind: RelationshipKind,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {} of {}", self.to, self.kind, self.from)
    }
}

/// Human readable relation of one member to another.
///
/// Derived from the shortest path only, so it is best effort. Step kinds are
/// summed into a generation delta (+1 per parent step, -1 per child step).
/// On the same generation:
///
/// * any sibling step gives `Sibling`;
/// * climbing k generations and descending k again gives `Sibling` for k = 1
///   (`[Parent, Child]`) and `Cousin` for k >= 2;
/// * anything else, including the co-parent path `[Child, Parent]`, is `Relative`.
///
/// Two-step paths are therefore not all cousins. In-laws are labelled by their
/// generation (`[Spouse, Parent]` is `Parent`), and so are aunts, uncles and
/// removed cousins (`[Parent, Parent, Child]` is `Parent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationshipLabel {
    Parent,
    Child,
    Spouse,
    Sibling,
    Grandparent,
    Grandchild,
    /// `n` generations up, n > 2
    GreatGrandparent(u32),
    /// `n` generations down, n > 2
    GreatGrandchild(u32),
    Cousin,
    Relative,
}

impl RelationshipLabel {
    fn from_kind(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::Parent => RelationshipLabel::Parent,
            RelationshipKind::Child => RelationshipLabel::Child,
            RelationshipKind::Spouse => RelationshipLabel::Spouse,
            RelationshipKind::Sibling => RelationshipLabel::Sibling,
        }
    }

    /// Label a path of step kinds.
    pub fn from_path(kinds: &[RelationshipKind]) -> Option<Self> {
        match kinds {
            [] => None,
            [single] => Some(Self::from_kind(*single)),
            _ => Some(Self::from_generations(kinds)),
        }
    }

    fn from_generations(kinds: &[RelationshipKind]) -> Self {
        let delta: i64 = kinds
            .iter()
            .map(|kind| match kind {
                RelationshipKind::Parent => 1,
                RelationshipKind::Child => -1,
                _ => 0,
            })
            .sum();

        match delta {
            0 if kinds.contains(&RelationshipKind::Sibling) => RelationshipLabel::Sibling,
            0 => match collateral_depth(kinds) {
                Some(1) => RelationshipLabel::Sibling,
                Some(_) => RelationshipLabel::Cousin,
                None => RelationshipLabel::Relative,
            },
            1 => RelationshipLabel::Parent,
            2 => RelationshipLabel::Grandparent,
            -1 => RelationshipLabel::Child,
            -2 => RelationshipLabel::Grandchild,
            n if n > 0 => RelationshipLabel::GreatGrandparent(generations(n)),
            n => RelationshipLabel::GreatGrandchild(generations(-n)),
        }
    }
}

fn generations(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `k` when the path climbs k generations to a shared ancestor and descends k again.
fn collateral_depth(kinds: &[RelationshipKind]) -> Option<usize> {
    let up = kinds
        .iter()
        .take_while(|&&k| k == RelationshipKind::Parent)
        .count();
    let down = &kinds[up..];
    let all_down = down.iter().all(|&k| k == RelationshipKind::Child);
    (up > 0 && all_down && down.len() == up).then_some(up)
}

impl fmt::Display for RelationshipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipLabel::Parent => f.write_str("Parent"),
            RelationshipLabel::Child => f.write_str("Child"),
            RelationshipLabel::Spouse => f.write_str("Spouse"),
            RelationshipLabel::Sibling => f.write_str("Sibling"),
            RelationshipLabel::Grandparent => f.write_str("Grandparent"),
            RelationshipLabel::Grandchild => f.write_str("Grandchild"),
            RelationshipLabel::GreatGrandparent(n) => write!(f, "{n}x Great-Grandparent"),
            RelationshipLabel::GreatGrandchild(n) => write!(f, "{n}x Great-Grandchild"),
            RelationshipLabel::Cousin => f.write_str("Cousin"),
            RelationshipLabel::Relative => f.write_str("Relative"),
        }
    }
}

impl<'a> FamilyGraph<'a> {
    /// Shortest path from one member to another, breadth first over every pointer
    /// and its inverse.
    ///
    /// `None` when both ids name the same member or no path exists.
    #[instrument(level = "debug", skip(self))]
    pub fn find_relationship_path(&self, from: &str, to: &str) -> DomainResult<Option<Vec<Step>>> {
        let start = self.require(from)?;
        let goal = self.require(to)?;
        Ok(self.shortest_path(start, goal))
    }

    fn shortest_path(&self, start: usize, goal: usize) -> Option<Vec<Step>> {
        if start == goal {
            return None;
        }

        let index = self.index;
        let mut came_from: Vec<Option<(usize, RelationshipKind)>> = vec![None; index.len()];
        let mut visited = vec![false; index.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(pos) = queue.pop_front() {
            for edge in index.edges(pos) {
                if visited[edge.target] {
                    continue;
                }
                visited[edge.target] = true;
                came_from[edge.target] = Some((pos, edge.kind));

                if edge.target == goal {
                    return Some(self.unwind(&came_from, goal));
                }
                queue.push_back(edge.target);
            }
        }
        None
    }

    fn unwind(&self, came_from: &[Option<(usize, RelationshipKind)>], goal: usize) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut current = goal;
        while let Some((previous, kind)) = came_from[current] {
            steps.push(Step {
                from: self.index.member_at(previous).id.clone(),
                to: self.index.member_at(current).id.clone(),
                kind,
            });
            current = previous;
        }
        steps.reverse();
        steps
    }

    /// What `to` is to `from`, e.g. `Grandparent`.
    pub fn calculate_relationship(
        &self,
        from: &str,
        to: &str,
    ) -> DomainResult<Option<RelationshipLabel>> {
        let start = self.require(from)?;
        let goal = self.require(to)?;
        Ok(self.label_between(start, goal))
    }

    fn label_between(&self, start: usize, goal: usize) -> Option<RelationshipLabel> {
        let path = self.shortest_path(start, goal)?;
        let kinds: Vec<RelationshipKind> = path.iter().map(|step| step.kind).collect();
        RelationshipLabel::from_path(&kinds)
    }

    /// Ancestors of `b` that are also ancestors of `a`, in `b`'s discovery order.
    #[instrument(level = "debug", skip(self))]
    pub fn find_common_ancestors(&self, a: &str, b: &str) -> DomainResult<Vec<&'a Member>> {
        let of_a = self.ancestors(a)?;
        let of_b = self.ancestors(b)?;
        Ok(of_b
            .members()
            .filter(|m| of_a.contains(m.id.as_str()))
            .collect())
    }

    /// Label of every other member relative to `id`, in input order.
    #[instrument(level = "debug", skip(self))]
    pub fn relationships_from(
        &self,
        id: &str,
    ) -> DomainResult<Vec<(MemberId, Option<RelationshipLabel>)>> {
        let start = self.require(id)?;
        let labels: Vec<(MemberId, Option<RelationshipLabel>)> = (0..self.index.len())
            .into_par_iter()
            .filter(|&pos| pos != start)
            .map(|pos| {
                (
                    self.index.member_at(pos).id.clone(),
                    self.label_between(start, pos),
                )
            })
            .collect();
        debug!(
            related = labels.iter().filter(|(_, l)| l.is_some()).count(),
            "relationships computed"
        );
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::RelationshipIndex;
    use RelationshipKind::*;

    fn chain() -> Vec<Member> {
        vec![
            Member::new("a", "A").with_relation(Child, "b"),
            Member::new("b", "B").with_relation(Child, "c"),
            Member::new("c", "C"),
        ]
    }

    #[test]
    fn given_child_chain_when_finding_path_then_two_parent_steps() {
        let index = RelationshipIndex::build(&chain());
        let graph = FamilyGraph::new(&index);

        let path = graph.find_relationship_path("a", "c").unwrap().unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path[0].to.as_str(), "b");
        assert!(path.iter().all(|s| s.kind == Parent));
        assert_eq!(
            graph.calculate_relationship("a", "c").unwrap(),
            Some(RelationshipLabel::Grandparent)
        );
        assert_eq!(
            graph.calculate_relationship("c", "a").unwrap(),
            Some(RelationshipLabel::Grandchild)
        );
    }

    #[test]
    fn given_same_member_when_finding_path_then_none() {
        let index = RelationshipIndex::build(&chain());
        let graph = FamilyGraph::new(&index);
        assert_eq!(graph.find_relationship_path("a", "a").unwrap(), None);
        assert_eq!(graph.calculate_relationship("a", "a").unwrap(), None);
    }

    #[test]
    fn given_disconnected_members_when_finding_path_then_none() {
        let index = RelationshipIndex::build(&[Member::new("x", "X"), Member::new("y", "Y")]);
        let graph = FamilyGraph::new(&index);
        assert_eq!(graph.find_relationship_path("x", "y").unwrap(), None);
        assert!(graph.find_relationship_path("x", "ghost").is_err());
    }

    #[test]
    fn given_paths_when_labelling_then_generations_and_collaterals() {
        assert_eq!(RelationshipLabel::from_path(&[]), None);
        assert_eq!(RelationshipLabel::from_path(&[Spouse]), Some(RelationshipLabel::Spouse));
        assert_eq!(
            RelationshipLabel::from_path(&[Parent, Child]),
            Some(RelationshipLabel::Sibling)
        );
        assert_eq!(
            RelationshipLabel::from_path(&[Parent, Parent, Child, Child]),
            Some(RelationshipLabel::Cousin)
        );
        assert_eq!(
            RelationshipLabel::from_path(&[Child, Parent]),
            Some(RelationshipLabel::Relative)
        );
        assert_eq!(
            RelationshipLabel::from_path(&[Spouse, Sibling]),
            Some(RelationshipLabel::Sibling)
        );
        assert_eq!(
            RelationshipLabel::from_path(&[Parent, Parent, Parent]),
            Some(RelationshipLabel::GreatGrandparent(3))
        );
        assert_eq!(RelationshipLabel::GreatGrandchild(4).to_string(), "4x Great-Grandchild");
    }

    #[test]
    fn given_two_step_same_generation_paths_when_labelling_then_only_shared_parent_is_sibling() {
        // Arrange
        let shared_parent = [Parent, Child];
        let co_parent = [Child, Parent];
        let in_law = [Spouse, Parent];

        // Act
        let labels = [
            RelationshipLabel::from_path(&shared_parent),
            RelationshipLabel::from_path(&co_parent),
            RelationshipLabel::from_path(&in_law),
            RelationshipLabel::from_path(&[Parent, Parent, Parent, Child, Child, Child]),
            RelationshipLabel::from_path(&[Parent, Parent, Child]),
        ];

        // Assert
        assert_eq!(
            labels,
            [
                Some(RelationshipLabel::Sibling),
                Some(RelationshipLabel::Relative),
                Some(RelationshipLabel::Parent),
                Some(RelationshipLabel::Cousin),
                Some(RelationshipLabel::Parent),
            ]
        );
    }

    #[test]
    fn given_two_siblings_when_finding_common_ancestors_then_shared_line() {
        let members = vec![
            Member::new("gp", "Gp"),
            Member::new("p", "P").with_relation(Child, "gp"),
            Member::new("x", "X").with_relation(Child, "p"),
            Member::new("y", "Y").with_relation(Child, "p"),
        ];
        let index = RelationshipIndex::build(&members);
        let graph = FamilyGraph::new(&index);

        let common: Vec<_> = graph
            .find_common_ancestors("x", "y")
            .unwrap()
            .iter()
            .map(|m| m.id.to_string())
            .collect();

        assert_eq!(common, vec!["p", "gp"]);
    }

    #[test]
    fn given_member_when_listing_relationships_then_every_other_member_once() {
        let index = RelationshipIndex::build(&chain());
        let graph = FamilyGraph::new(&index);

        let labels = graph.relationships_from("b").unwrap();

        assert_eq!(
            labels,
            vec![
                (MemberId::from("a"), Some(RelationshipLabel::Child)),
                (MemberId::from("c"), Some(RelationshipLabel::Parent)),
            ]
        );
    }
}
