//! Family service
//!
//! Loads member snapshots through the filesystem boundary and runs the
//! forest builder and queries with the configured settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    Diagnostic, FamilyForest, FamilyGraph, FamilySnapshot, FamilyStatistics, ForestBuilder,
    Member, RelationshipIndex, Severity, ViewMode,
};
use crate::infrastructure::traits::FileSystem;

/// One loaded snapshot, indexed and ready for queries.
#[derive(Debug, Clone)]
pub struct FamilyData {
    /// Where the snapshot was read from
    pub source: PathBuf,
    pub index: RelationshipIndex,
    /// Validation and indexing findings
    pub diagnostics: Vec<Diagnostic>,
}

impl FamilyData {
    pub fn graph(&self) -> FamilyGraph<'_> {
        FamilyGraph::new(&self.index)
    }

    pub fn members(&self) -> &[Member] {
        self.index.members()
    }
}

/// Service for loading family snapshots and answering questions about them.
pub struct FamilyService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl FamilyService {
    /// Create a new family service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The snapshot to use: the explicit file, else `data_file` from the settings.
    pub fn resolve_source(&self, file: Option<&Path>) -> ApplicationResult<PathBuf> {
        file.map(Path::to_path_buf)
            .or_else(|| self.settings.data_file.clone())
            .ok_or(ApplicationError::NoSnapshot)
    }

    /// Read, validate and index a snapshot file.
    ///
    /// Rejected records and other data problems are logged and kept in
    /// [`FamilyData::diagnostics`]; only unreadable or malformed files fail.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<FamilyData> {
        if !self.fs.exists(path) || !self.fs.is_file(path) {
            return Err(ApplicationError::SnapshotNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read member snapshot", path)?;

        let snapshot = FamilySnapshot::from_json(&content)?;
        let index = RelationshipIndex::build(&snapshot.members);

        let mut diagnostics = snapshot.diagnostics;
        diagnostics.extend_from_slice(index.diagnostics());
        report(&diagnostics);

        info!(
            members = index.len(),
            problems = diagnostics.len(),
            "loaded {}",
            path.display()
        );
        Ok(FamilyData {
            source: path.to_path_buf(),
            index,
            diagnostics,
        })
    }

    /// Build the family forest honouring `max_depth`.
    #[instrument(level = "debug", skip(self, family))]
    pub fn build_forest(&self, family: &FamilyData) -> FamilyForest {
        let forest = ForestBuilder::new()
            .with_max_depth(self.settings.max_depth)
            .build(&family.index);
        report(forest.diagnostics());
        debug!(
            generations = forest.depth(),
            virtual_root = forest.is_virtual_root(),
            "forest built"
        );
        forest
    }

    /// Members shown by a view.
    ///
    /// An unknown focus id is logged and yields an empty view rather than an error.
    #[instrument(level = "debug", skip(self, family))]
    pub fn view_members(
        &self,
        family: &FamilyData,
        mode: ViewMode,
        focus: Option<&str>,
    ) -> Vec<Member> {
        let current_user = self.settings.current_user.as_deref();
        match family.graph().filter_members(mode, focus, current_user) {
            Ok(members) => members,
            Err(e) => {
                warn!("{e}, showing an empty {mode} view");
                Vec::default()
            }
        }
    }

    /// Build the forest of just the members a view shows.
    pub fn build_view_forest(
        &self,
        family: &FamilyData,
        mode: ViewMode,
        focus: Option<&str>,
    ) -> FamilyForest {
        if mode == ViewMode::Full {
            return self.build_forest(family);
        }
        let members = self.view_members(family, mode, focus);
        let view = FamilyData {
            source: family.source.clone(),
            index: RelationshipIndex::build(&members),
            diagnostics: Vec::new(),
        };
        self.build_forest(&view)
    }

    pub fn focus_person<'a>(&self, family: &'a FamilyData) -> Option<&'a Member> {
        family
            .graph()
            .find_focus_person(self.settings.current_user.as_deref())
    }

    pub fn statistics(&self, family: &FamilyData, today: NaiveDate) -> FamilyStatistics {
        FamilyStatistics::calculate_with_span(
            family.members(),
            today,
            self.settings.generation_span_years,
        )
    }

    /// Write text output (e.g. a CSV export) to a file.
    pub fn export(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        self.fs
            .write(path, content)
            .with_path_context("write export", path)
    }
}

/// Surface diagnostics in the log at their severity.
fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity() {
            Severity::Warning => warn!("{diagnostic}"),
            Severity::Info => debug!("{diagnostic}"),
        }
    }
}
