//! pyebwa: family trees from flat member snapshots
//!
//! Layers, leaf first: `domain` (index, forest builder, queries), `application`
//! (services), `infrastructure` (I/O boundary and wiring), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
