//! The build: load, declare, transform, write, verify, clean up.

pub mod cleanup;
pub mod roles;
pub mod transform;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::{BuildConfig, IntegrityMode};
use crate::error::{BuildError, Result};
use crate::loader::{self, SourcePaths, Staging};
use crate::metrics::BuildMetrics;
use crate::schema::{self, Entity, SchemaOutcome};
use crate::storage::{foreign_key_violations, insert_rows, ForeignKeyViolation, InsertCounts, Store};
use cleanup::{ExpectedGames, Verification};
use transform::NormalizedSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub integrity: IntegrityMode,
    pub drop_staging: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&BuildConfig::default())
    }
}

impl From<&BuildConfig> for BuildOptions {
    fn from(config: &BuildConfig) -> Self {
        Self {
            integrity: config.integrity,
            drop_staging: config.drop_staging,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub source: &'static str,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCounts {
    pub table: &'static str,
    #[serde(flatten)]
    pub counts: InsertCounts,
}

/// Result of a complete build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub integrity: IntegrityMode,
    pub sources: Vec<SourceCount>,
    pub schema: SchemaOutcome,
    pub tables: Vec<TableCounts>,
    /// Only populated in advisory mode; strict builds fail instead
    pub integrity_violations: Vec<ForeignKeyViolation>,
    pub verification: Verification,
    pub legacy_tables_dropped: Vec<String>,
}

impl BuildReport {
    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.counts.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.tables.iter().map(|t| t.counts.skipped).sum()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn table(&self, table: &str) -> Option<InsertCounts> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.counts)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the build against one store
pub struct Pipeline<'a> {
    store: &'a mut Store,
    options: BuildOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a mut Store, options: BuildOptions) -> Self {
        Self { store, options }
    }

    /// Load the source extracts and build from them
    pub fn run(&mut self, sources: &SourcePaths) -> Result<BuildReport> {
        let started_at = Utc::now();
        let staging = loader::load(sources)?;
        self.execute(staging, started_at)
    }

    /// Build from extracts already in memory
    pub fn run_staged(&mut self, staging: Staging) -> Result<BuildReport> {
        self.execute(staging, Utc::now())
    }

    #[instrument(skip(self, staging), fields(integrity = ?self.options.integrity))]
    fn execute(&mut self, staging: Staging, started_at: DateTime<Utc>) -> Result<BuildReport> {
        let sources = staging
            .tables()
            .iter()
            .map(|t| SourceCount {
                source: t.name(),
                rows: t.len(),
            })
            .collect();

        let schema = schema::declare(self.store.connection())?;
        let set = transform::normalize(&staging)?;
        let (tables, integrity_violations) = self.write(&set)?;

        let start = Instant::now();
        let expected = ExpectedGames::from_set(&set);
        drop(set);
        let verification = cleanup::verify(self.store.connection(), &expected)?;
        let legacy_tables_dropped = cleanup::cleanup(
            &*self.store,
            staging,
            &verification,
            self.options.drop_staging,
        )?;
        BuildMetrics::record_stage_duration("cleanup", start.elapsed().as_secs_f64());

        let report = BuildReport {
            started_at,
            finished_at: Utc::now(),
            integrity: self.options.integrity,
            sources,
            schema,
            tables,
            integrity_violations,
            verification,
            legacy_tables_dropped,
        };
        info!(
            inserted = report.total_inserted(),
            skipped = report.total_skipped(),
            duration_secs = report.duration_secs(),
            "Build complete"
        );
        Ok(report)
    }

    /// Write every entity in one transaction, parents before children
    fn write(
        &mut self,
        set: &NormalizedSet,
    ) -> Result<(Vec<TableCounts>, Vec<ForeignKeyViolation>)> {
        let start = Instant::now();
        let strict = self.options.integrity == IntegrityMode::Strict;
        // Has no effect inside a transaction, so it is set first.
        self.store.set_foreign_keys(strict)?;

        let tx = self.store.transaction()?;
        if strict {
            tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        }

        let tables = vec![
            table_counts(Entity::Person, insert_rows(&tx, Entity::Person, &set.persons)?),
            table_counts(Entity::Park, insert_rows(&tx, Entity::Park, &set.parks)?),
            table_counts(Entity::League, insert_rows(&tx, Entity::League, &set.leagues)?),
            table_counts(
                Entity::AppearanceType,
                insert_rows(&tx, Entity::AppearanceType, &set.appearance_types)?,
            ),
            table_counts(Entity::Team, insert_rows(&tx, Entity::Team, &set.teams)?),
            table_counts(Entity::Game, insert_rows(&tx, Entity::Game, &set.games)?),
            table_counts(
                Entity::TeamPerformance,
                insert_rows(&tx, Entity::TeamPerformance, &set.team_performances)?,
            ),
            table_counts(
                Entity::PersonAppearance,
                insert_rows(&tx, Entity::PersonAppearance, &set.person_appearances)?,
            ),
        ];

        if strict {
            let violations = foreign_key_violations(&tx)?;
            if let Some(first) = violations.first() {
                BuildMetrics::record_integrity_violations(violations.len());
                // Dropping `tx` rolls every entity back.
                return Err(BuildError::Integrity {
                    count: violations.len(),
                    first: first.to_string(),
                });
            }
        }
        tx.commit()?;
        BuildMetrics::record_stage_duration("write", start.elapsed().as_secs_f64());

        let violations = if strict {
            Vec::new()
        } else {
            let violations = self.store.foreign_key_violations()?;
            if !violations.is_empty() {
                BuildMetrics::record_integrity_violations(violations.len());
                for violation in violations.iter().take(10) {
                    warn!(%violation, "Unresolved foreign key");
                }
            }
            violations
        };
        Ok((tables, violations))
    }
}

fn table_counts(entity: Entity, counts: InsertCounts) -> TableCounts {
    TableCounts {
        table: entity.table_name(),
        counts,
    }
}
