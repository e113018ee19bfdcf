//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod index;
pub mod path;
pub mod snapshot;
pub mod statistics;
pub mod views;

pub use arena::{FamilyUnit, NodeData, TreeArena, TreeNode, TreeView, ViewNode};
pub use builder::{build_forest, FamilyForest, ForestBuilder};
pub use entities::*;
pub use error::{Diagnostic, DomainError, DomainResult, Severity};
pub use index::{build_index, Edge, RelationshipIndex};
pub use path::{RelationshipLabel, Step};
pub use snapshot::FamilySnapshot;
pub use statistics::{AgeGroups, FamilyStatistics};
pub use views::{FamilyGraph, Lineage, ViewMode};
