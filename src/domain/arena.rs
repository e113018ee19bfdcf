use generational_arena::{Arena, Index};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use tracing::instrument;

use crate::domain::entities::{Member, MemberId, MemberRecord};

/// Generations drawn with full guides in [`TreeArena::to_tree_string`].
pub const MAX_INDENT: usize = 32;

/// One generational unit: a member and the spouse rendered beside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyUnit {
    pub member: Member,
    pub spouse: Option<Member>,
}

impl fmt::Display for FamilyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.member)?;
        if let Some(spouse) = &self.spouse {
            write!(f, " + {}", spouse)?;
        }
        Ok(())
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Synthetic container holding several disconnected trees
    VirtualRoot,
    Unit(FamilyUnit),
}

impl NodeData {
    pub fn unit(&self) -> Option<&FamilyUnit> {
        match self {
            NodeData::Unit(unit) => Some(unit),
            NodeData::VirtualRoot => None,
        }
    }
}

/// Tree node in the arena-based family structure.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes, in birth order
    pub children: Vec<Index>,
}

/// Arena-based tree holding one built family forest.
///
/// Uses a generational arena for memory-safe node references and O(1) lookups.
#[derive(Debug)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    root: Option<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    /// Drop a virtual root holding exactly one tree and make that tree the root.
    pub fn collapse_single_child_root(&mut self) {
        let Some(root_idx) = self.root else {
            return;
        };
        let only_child = match self.arena.get(root_idx) {
            Some(node) if node.data == NodeData::VirtualRoot && node.children.len() == 1 => {
                node.children[0]
            }
            _ => return,
        };
        self.arena.remove(root_idx);
        if let Some(child) = self.arena.get_mut(only_child) {
            child.parent = None;
        }
        self.root = Some(only_child);
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator {
        PostOrderIterator::new(self)
    }

    /// Number of generations, not counting a virtual root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max_depth = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            let Some(node) = self.get_node(idx) else {
                continue;
            };
            let depth = match node.data {
                NodeData::VirtualRoot => depth,
                NodeData::Unit(_) => depth + 1,
            };
            max_depth = max_depth.max(depth);
            for &child in &node.children {
                stack.push((child, depth));
            }
        }
        max_depth
    }

    /// Units without children, left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_units(&self) -> Vec<&FamilyUnit> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .filter_map(|(_, node)| node.data.unit())
            .collect()
    }

    /// Children of the virtual root, or the single root unit.
    pub fn top_level_units(&self) -> Vec<&FamilyUnit> {
        let Some(root) = self.root.and_then(|idx| self.get_node(idx)) else {
            return Vec::new();
        };
        match &root.data {
            NodeData::Unit(unit) => vec![unit],
            NodeData::VirtualRoot => root
                .children
                .iter()
                .filter_map(|&idx| self.get_node(idx))
                .filter_map(|node| node.data.unit())
                .collect(),
        }
    }

    /// Every member placed in the tree (unit members and spouses), pre-order.
    pub fn placed_member_ids(&self) -> Vec<&MemberId> {
        let mut ids = Vec::new();
        for (_, node) in self.iter() {
            if let NodeData::Unit(unit) = &node.data {
                ids.push(&unit.member.id);
                if let Some(spouse) = &unit.spouse {
                    ids.push(&spouse.id);
                }
            }
        }
        ids
    }

    /// Text rendering of the tree, one unit per line.
    ///
    /// Guides stop widening after [`MAX_INDENT`] generations; deeper lines are
    /// tagged with their level instead.
    pub fn to_tree_string(&self) -> String {
        let Some(root_idx) = self.root else {
            return "(empty family tree)\n".to_string();
        };

        let mut out = String::new();
        // (node, guide drawn before its connector, connector, level)
        let mut stack: Vec<(Index, String, Option<bool>, usize)> =
            vec![(root_idx, String::new(), None, 0)];
        while let Some((idx, guide, is_last, level)) = stack.pop() {
            let Some(node) = self.get_node(idx) else {
                continue;
            };
            out.push_str(&guide);
            let child_guide = match is_last {
                None => String::new(),
                Some(is_last) => {
                    out.push_str(if is_last { "└── " } else { "├── " });
                    if level > MAX_INDENT {
                        guide
                    } else {
                        guide + if is_last { "    " } else { "│   " }
                    }
                }
            };
            if level > MAX_INDENT {
                let _ = write!(out, "(level {level}) ");
            }
            match &node.data {
                NodeData::VirtualRoot => out.push_str("Family"),
                NodeData::Unit(unit) => {
                    let _ = write!(out, "{unit}");
                }
            }
            out.push('\n');

            let last = node.children.len().saturating_sub(1);
            for (i, &child) in node.children.iter().enumerate().rev() {
                stack.push((child, child_guide.clone(), Some(i == last), level + 1));
            }
        }
        out
    }

    /// Flat, serializable copy of the tree for rendering clients.
    ///
    /// Nodes are listed in pre-order and refer to each other by position.
    pub fn to_view(&self) -> TreeView {
        let mut view = TreeView {
            is_virtual_root: self.root.is_none(),
            ..TreeView::default()
        };
        let mut positions: HashMap<Index, usize> = HashMap::with_capacity(self.len());

        for (idx, node) in self.iter() {
            let NodeData::Unit(unit) = &node.data else {
                view.is_virtual_root = true;
                continue;
            };
            let position = view.nodes.len();
            let parent = node.parent.and_then(|p| positions.get(&p).copied());
            let generation = match parent {
                Some(p) => {
                    view.nodes[p].children.push(position);
                    view.nodes[p].generation + 1
                }
                None => {
                    view.roots.push(position);
                    0
                }
            };
            view.nodes.push(ViewNode {
                member: unit.member.to_record(),
                spouse: unit.spouse.as_ref().map(Member::to_record),
                generation,
                parent,
                children: Vec::new(),
            });
            positions.insert(idx, position);
        }
        view
    }
}

/// Serializable forest as handed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    /// Several disconnected trees (or none) under a synthetic root
    pub is_virtual_root: bool,
    /// Positions of the top-level units in `nodes`
    pub roots: Vec<usize>,
    pub nodes: Vec<ViewNode>,
}

/// One family unit of a [`TreeView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    pub member: MemberRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse: Option<MemberRecord>,
    /// 0 for top-level units
    pub generation: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Positions in birth order
    pub children: Vec<usize>,
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push((root, false));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
