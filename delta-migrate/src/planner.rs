//! Migration planning.
//!
//! The planner ties the pieces together: it validates both snapshots, merges
//! configured rename hints with the caller's, diffs, and renders SQL.

use std::sync::Arc;

use delta_schema::{Schema, validate_schema};

use crate::change::RenameHint;
use crate::config::MigrateConfig;
use crate::diff::{DiffResult, SchemaDiffer};
use crate::error::MigrateResult;
use crate::sql::{MigrationSql, PostgresSqlGenerator};
use crate::trace::{DiffTrace, TracingTrace};

/// Result of planning a migration between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Detected changes.
    pub diff: DiffResult,
    /// Generated SQL.
    pub sql: MigrationSql,
    /// One line per unsafe change.
    pub warnings: Vec<String>,
}

impl MigrationPlan {
    /// Check if there's anything to migrate.
    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }

    /// Get a summary of the plan.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No changes to apply".to_string();
        }
        format!("{}; checksum {}", self.diff.summary, &self.sql.checksum()[..12])
    }
}

/// Plans migrations according to a [`MigrateConfig`].
pub struct MigrationPlanner {
    config: MigrateConfig,
    trace: Arc<dyn DiffTrace>,
}

impl std::fmt::Debug for MigrationPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationPlanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for MigrationPlanner {
    fn default() -> Self {
        Self::new(MigrateConfig::default())
    }
}

impl MigrationPlanner {
    /// Create a planner.
    pub fn new(config: MigrateConfig) -> Self {
        Self {
            config,
            trace: Arc::new(TracingTrace),
        }
    }

    /// Send diff diagnostics to `trace`.
    pub fn with_trace(mut self, trace: Arc<dyn DiffTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Plan the migration from `old` to `new`.
    ///
    /// `hints` are applied after the configured renames.
    pub fn plan(
        &self,
        old: &Schema,
        new: &Schema,
        hints: &[RenameHint],
    ) -> MigrateResult<MigrationPlan> {
        validate_schema(old)?;
        validate_schema(new)?;

        let mut all_hints = self.config.renames.clone();
        all_hints.extend(hints.iter().cloned());

        let generator = PostgresSqlGenerator::new(self.config.generator.clone());
        let differ = SchemaDiffer::new()
            .with_trace(Arc::clone(&self.trace))
            .with_generator(generator.clone());

        let diff = differ.compare(old, new, &all_hints)?;
        let sql = generator.generate_migration(&diff)?;

        let warnings = diff
            .unsafe_changes()
            .map(|change| match &change.safety_note {
                Some(note) => format!("{}: {}", change, note),
                None => change.to_string(),
            })
            .collect();

        tracing::debug!(
            hints = all_hints.len(),
            changes = diff.changes.len(),
            checksum = %sql.checksum(),
            "planned migration"
        );

        Ok(MigrationPlan {
            diff,
            sql,
            warnings,
        })
    }
}
