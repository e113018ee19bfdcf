//! View queries over the relationship graph: lineages, focus person, view filters.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::domain::entities::{Member, MemberId, RelationshipKind};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::index::RelationshipIndex;

/// Which subset of the family a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    #[default]
    Full,
    Ancestors,
    Descendants,
    Hourglass,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Full => "full",
            ViewMode::Ancestors => "ancestors",
            ViewMode::Descendants => "descendants",
            ViewMode::Hourglass => "hourglass",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ViewMode::Full),
            "ancestors" => Ok(ViewMode::Ancestors),
            "descendants" => Ok(ViewMode::Descendants),
            "hourglass" => Ok(ViewMode::Hourglass),
            _ => Err(DomainError::InvalidViewMode(s.to_string())),
        }
    }
}

/// Result of a lineage query.
///
/// `lineal` is the blood line in discovery order, starting with the person
/// queried; `partners` are spouses pulled in so that couples stay together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage<'a> {
    lineal: Vec<&'a Member>,
    partners: Vec<&'a Member>,
}

impl<'a> Lineage<'a> {
    pub fn lineal(&self) -> &[&'a Member] {
        &self.lineal
    }

    pub fn partners(&self) -> &[&'a Member] {
        &self.partners
    }

    /// Lineal members first, then partners.
    pub fn members(&self) -> impl Iterator<Item = &'a Member> + '_ {
        self.lineal.iter().chain(self.partners.iter()).copied()
    }

    pub fn ids(&self) -> Vec<&'a MemberId> {
        self.members().map(|m| &m.id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members().any(|m| m.id.as_str() == id)
    }

    pub fn is_lineal(&self, id: &str) -> bool {
        self.lineal.iter().any(|m| m.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.lineal.len() + self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineal.is_empty() && self.partners.is_empty()
    }

    /// Merge two lineages of the same person; nobody is listed twice.
    pub fn union(mut self, other: Lineage<'a>) -> Self {
        for member in other.lineal {
            if !self.is_lineal(member.id.as_str()) {
                self.lineal.push(member);
            }
        }
        self.partners.retain(|p| !lists_member(&self.lineal, p));
        for member in other.partners {
            if !self.contains(member.id.as_str()) {
                self.partners.push(member);
            }
        }
        self
    }
}

fn lists_member(members: &[&Member], member: &Member) -> bool {
    members.iter().any(|m| m.id == member.id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Query engine over one indexed snapshot.
///
/// Every query owns its own visited set, so a graph can be shared freely
/// across threads.
#[derive(Debug, Clone, Copy)]
pub struct FamilyGraph<'a> {
    pub(crate) index: &'a RelationshipIndex,
}

impl<'a> FamilyGraph<'a> {
    pub fn new(index: &'a RelationshipIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a RelationshipIndex {
        self.index
    }

    pub(crate) fn require(&self, id: &str) -> DomainResult<usize> {
        self.index
            .position(id)
            .ok_or_else(|| DomainError::MemberNotFound(MemberId::from(id)))
    }

    /// The person, their parents (by either pointer direction) and so on upwards.
    ///
    /// Spouses of a parent reached through the person's own `child` pointer
    /// are included as partners.
    #[instrument(level = "debug", skip(self))]
    pub fn ancestors(&self, id: &str) -> DomainResult<Lineage<'a>> {
        let start = self.require(id)?;
        Ok(self.walk(start, Direction::Up))
    }

    /// The person, their children (by either pointer direction) and so on
    /// downwards, plus the spouse of everyone visited.
    #[instrument(level = "debug", skip(self))]
    pub fn descendants(&self, id: &str) -> DomainResult<Lineage<'a>> {
        let start = self.require(id)?;
        Ok(self.walk(start, Direction::Down))
    }

    /// Ancestors and descendants together.
    #[instrument(level = "debug", skip(self))]
    pub fn hourglass(&self, id: &str) -> DomainResult<Lineage<'a>> {
        let start = self.require(id)?;
        let up = self.walk(start, Direction::Up);
        let down = self.walk(start, Direction::Down);
        Ok(up.union(down))
    }

    fn walk(&self, start: usize, direction: Direction) -> Lineage<'a> {
        let index = self.index;
        let mut visited = vec![false; index.len()];
        let mut lineal: Vec<usize> = Vec::new();
        let mut partners: Vec<usize> = Vec::new();
        let mut stack = vec![start];

        // Same visiting order as a recursive walk: neighbours are pushed reversed
        // and the visited check happens on pop.
        while let Some(pos) = stack.pop() {
            if visited[pos] {
                continue;
            }
            visited[pos] = true;
            lineal.push(pos);

            let (claims, pointer) = match direction {
                Direction::Up => (index.parent_claims(pos), RelationshipKind::Child),
                Direction::Down => (index.child_claims(pos), RelationshipKind::Parent),
            };
            let mut next = claims.to_vec();

            if index.member_at(pos).relationship() == Some(pointer) {
                if let Some(target) = index.related_position(pos) {
                    next.push(target);
                    if direction == Direction::Up {
                        partners.extend(index.spouses_of(target));
                    }
                }
            }
            if direction == Direction::Down {
                partners.extend(index.spouses_of(pos));
            }

            stack.extend(next.into_iter().rev());
        }

        let mut seen = visited;
        partners.retain(|&p| !std::mem::replace(&mut seen[p], true));

        debug!(
            lineal = lineal.len(),
            partners = partners.len(),
            ?direction,
            "lineage collected"
        );
        Lineage {
            lineal: lineal.into_iter().map(|p| index.member_at(p)).collect(),
            partners: partners.into_iter().map(|p| index.member_at(p)).collect(),
        }
    }

    /// Default subject of filtered views.
    ///
    /// The member linked to `current_user` (by `userId`, else by id) if there is
    /// one, otherwise the best connected member; ties go to the earliest member.
    pub fn find_focus_person(&self, current_user: Option<&str>) -> Option<&'a Member> {
        let members = self.index.members();
        if let Some(user) = current_user.filter(|u| !u.is_empty()) {
            let linked = members
                .iter()
                .find(|m| m.user_id.as_deref() == Some(user))
                .or_else(|| self.index.get(user));
            if linked.is_some() {
                return linked;
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for pos in 0..members.len() {
            let count = self.index.connection_count(pos);
            if best.map_or(true, |(_, max)| count > max) {
                best = Some((pos, count));
            }
        }
        best.map(|(pos, _)| self.index.member_at(pos))
    }

    /// Members shown by a view, as copies in input order.
    ///
    /// Without an explicit focus the focus person is used; an empty snapshot
    /// yields an empty view.
    #[instrument(level = "debug", skip(self))]
    pub fn filter_members(
        &self,
        mode: ViewMode,
        focus: Option<&str>,
        current_user: Option<&str>,
    ) -> DomainResult<Vec<Member>> {
        let focus_id = match focus {
            Some(id) => Some(id),
            None => self
                .find_focus_person(current_user)
                .map(|member| member.id.as_str()),
        };

        let lineage = match (mode, focus_id) {
            (ViewMode::Full, _) => return Ok(self.index.members().to_vec()),
            (_, None) => return Ok(Vec::new()),
            (ViewMode::Ancestors, Some(id)) => self.ancestors(id)?,
            (ViewMode::Descendants, Some(id)) => self.descendants(id)?,
            (ViewMode::Hourglass, Some(id)) => self.hourglass(id)?,
        };

        Ok(self
            .index
            .members()
            .iter()
            .filter(|m| lineage.contains(m.id.as_str()))
            .cloned()
            .collect())
    }
}
