//! Forest builder: turns an indexed member list into renderable family trees.

use std::cmp::Ordering;

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::{FamilyUnit, NodeData, TreeArena, TreeView};
use crate::domain::entities::{Member, MemberId, RelationshipKind};
use crate::domain::error::Diagnostic;
use crate::domain::index::RelationshipIndex;

/// Birth order: dated members ascending, undated after them, ties keep input order
/// (callers rely on the stability of `sort_by`).
pub fn by_birth_date(a: &Member, b: &Member) -> Ordering {
    match (a.birth_date, b.birth_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Root policy: who starts a tree of their own.
pub fn is_root(index: &RelationshipIndex, member: &Member) -> bool {
    match &member.relation {
        None => true,
        Some(relation) => match relation.kind {
            RelationshipKind::Parent | RelationshipKind::Sibling => true,
            RelationshipKind::Child | RelationshipKind::Spouse => {
                !index.contains(relation.related_to.as_str())
            }
        },
    }
}

/// A built family forest plus everything noticed while building it.
#[derive(Debug)]
pub struct FamilyForest {
    tree: TreeArena,
    diagnostics: Vec<Diagnostic>,
}

impl FamilyForest {
    pub fn tree(&self) -> &TreeArena {
        &self.tree
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (TreeArena, Vec<Diagnostic>) {
        (self.tree, self.diagnostics)
    }

    pub fn is_virtual_root(&self) -> bool {
        self.root_node_data()
            .map_or(true, |data| *data == NodeData::VirtualRoot)
    }

    /// The root unit when the forest is a single tree.
    pub fn root_unit(&self) -> Option<&FamilyUnit> {
        self.root_node_data().and_then(NodeData::unit)
    }

    pub fn top_level_units(&self) -> Vec<&FamilyUnit> {
        self.tree.top_level_units()
    }

    /// Number of generations in the deepest tree.
    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn placed_member_ids(&self) -> Vec<&MemberId> {
        self.tree.placed_member_ids()
    }

    pub fn to_tree_string(&self) -> String {
        self.tree.to_tree_string()
    }

    pub fn to_view(&self) -> TreeView {
        self.tree.to_view()
    }

    fn root_node_data(&self) -> Option<&NodeData> {
        self.tree
            .root()
            .and_then(|idx| self.tree.get_node(idx))
            .map(|node| &node.data)
    }
}

struct Frame {
    pos: usize,
    parent_idx: Index,
    parent_pos: Option<usize>,
    generation: usize,
}

/// Constructs family forests from a relationship index.
#[derive(Debug, Default)]
pub struct ForestBuilder {
    max_depth: Option<usize>,
    processed: Vec<bool>,
    truncated: Vec<bool>,
    diagnostics: Vec<Diagnostic>,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop expanding below this many generations.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth.filter(|&d| d > 0);
        self
    }

    /// Build the forest for an index.
    ///
    /// A single tree becomes the root; several trees (or none) hang under a
    /// virtual root, in birth order of their root members.
    #[instrument(level = "debug", skip(self, index), fields(members = index.len()))]
    pub fn build(&mut self, index: &RelationshipIndex) -> FamilyForest {
        // Reset state for a fresh build
        self.processed = vec![false; index.len()];
        self.truncated = vec![false; index.len()];
        self.diagnostics = Vec::new();

        let mut roots: Vec<usize> = (0..index.len())
            .filter(|&pos| is_root(index, index.member_at(pos)))
            .collect();
        roots.sort_by(|&a, &b| by_birth_date(index.member_at(a), index.member_at(b)));
        debug!(roots = roots.len(), "root members found");

        let mut tree = TreeArena::new();
        let virtual_root = tree.insert_node(NodeData::VirtualRoot, None);

        let mut stack: Vec<Frame> = roots
            .iter()
            .rev()
            .map(|&pos| Frame {
                pos,
                parent_idx: virtual_root,
                parent_pos: None,
                generation: 1,
            })
            .collect();

        while let Some(frame) = stack.pop() {
            self.place(index, &mut tree, frame, &mut stack);
        }

        tree.collapse_single_child_root();
        self.report_unplaced(index);

        FamilyForest {
            tree,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn place(
        &mut self,
        index: &RelationshipIndex,
        tree: &mut TreeArena,
        frame: Frame,
        stack: &mut Vec<Frame>,
    ) {
        let Frame {
            pos,
            parent_idx,
            parent_pos,
            generation,
        } = frame;
        let member = index.member_at(pos);

        // Cycle and convergence guard
        if self.processed[pos] {
            trace!(member = %member.id, "already placed");
            if let Some(parent_pos) = parent_pos {
                self.diagnostics.push(Diagnostic::AlreadyPlaced {
                    member: member.id.clone(),
                    parent: index.member_at(parent_pos).id.clone(),
                });
            }
            return;
        }
        self.processed[pos] = true;

        let spouse = index
            .spouse_claims(pos)
            .iter()
            .copied()
            .find(|&s| !self.processed[s]);
        if let Some(s) = spouse {
            self.processed[s] = true;
        }

        let mut children: Vec<usize> = index.child_claims(pos).to_vec();
        if let Some(s) = spouse {
            children.extend_from_slice(index.child_claims(s));
            children.sort_unstable();
            children.dedup();
        }
        children.sort_by(|&a, &b| by_birth_date(index.member_at(a), index.member_at(b)));

        let unit = FamilyUnit {
            member: member.clone(),
            spouse: spouse.map(|s| index.member_at(s).clone()),
        };
        let node_idx = tree.insert_node(NodeData::Unit(unit), Some(parent_idx));

        if children.is_empty() {
            return;
        }
        if let Some(limit) = self.max_depth.filter(|&limit| generation >= limit) {
            self.diagnostics.push(Diagnostic::DepthLimitReached {
                member: member.id.clone(),
                limit,
            });
            for &child in &children {
                self.truncated[child] = true;
            }
            return;
        }

        for &child in children.iter().rev() {
            stack.push(Frame {
                pos: child,
                parent_idx: node_idx,
                parent_pos: Some(pos),
                generation: generation + 1,
            });
        }
    }

    /// Explain every member that ended up in no tree.
    ///
    /// Follows each member's anchor (`relatedTo` of a child or spouse pointer)
    /// until it reaches a placed member, a truncated branch, or loops.
    fn report_unplaced(&mut self, index: &RelationshipIndex) {
        let n = index.len();
        let mut seen = vec![false; n];
        let mut covered = vec![false; n];

        for start in 0..n {
            if self.processed[start] || seen[start] {
                continue;
            }

            let mut path: Vec<usize> = Vec::new();
            let mut cycle_start: Option<usize> = None;
            let mut is_covered = false;
            let mut current = Some(start);

            while let Some(pos) = current {
                if self.processed[pos] {
                    break;
                }
                if self.truncated[pos] {
                    is_covered = true;
                    break;
                }
                if let Some(at) = path.iter().position(|&p| p == pos) {
                    cycle_start = Some(at);
                    break;
                }
                if seen[pos] {
                    is_covered = covered[pos];
                    break;
                }
                path.push(pos);
                current = anchor(index, pos);
            }

            let cycle = cycle_start.map(|at| path[at..].to_vec()).unwrap_or_default();
            if !cycle.is_empty() {
                self.diagnostics.push(Diagnostic::CycleDetected {
                    members: cycle.iter().map(|&p| index.member_at(p).id.clone()).collect(),
                });
            }

            for &pos in &path {
                seen[pos] = true;
                covered[pos] = is_covered;
                if is_covered || cycle.contains(&pos) {
                    continue;
                }
                if let Some(anchor_id) = index.member_at(pos).related_to() {
                    self.diagnostics.push(Diagnostic::Unplaced {
                        member: index.member_at(pos).id.clone(),
                        anchor: anchor_id.clone(),
                    });
                }
            }
        }
    }
}

/// Member a non-root hangs from in the tree: the target of its child or spouse pointer.
fn anchor(index: &RelationshipIndex, pos: usize) -> Option<usize> {
    match index.member_at(pos).relationship() {
        Some(RelationshipKind::Child) | Some(RelationshipKind::Spouse) => index
            .member_at(pos)
            .related_to()
            .and_then(|id| index.position(id.as_str())),
        _ => None,
    }
}

/// Index a member list and build its forest with default options.
pub fn build_forest(members: &[Member]) -> FamilyForest {
    let index = RelationshipIndex::build(members);
    ForestBuilder::new().build(&index)
}
