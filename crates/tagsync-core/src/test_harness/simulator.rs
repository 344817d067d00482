//! Seeded end-to-end simulation
//!
//! Drives an [`EditingSession`] against an [`InMemoryStore`] with random
//! rejections and transport failures, saving until every change is
//! persisted or the round limit is reached.
//!
//! Checked at the end:
//! - nothing remains stale or deleted locally
//! - the store holds exactly the entries the registry holds
//! - no chunk exceeded its configured length

use super::memory_store::InMemoryStore;
use crate::config::SyncConfig;
use crate::context::SessionContext;
use crate::error::SyncError;
use crate::outcome::SaveOutcome;
use crate::session::EditingSession;
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use std::fmt::Write as _;
use std::sync::Arc;
use tagsync_model::{
    AttributeData, ClientId, DocumentId, EntryPatch, Framework, Widget, WidgetKind,
};
use tracing::{debug, info};

/// Simulation parameters
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Entries created before the first save
    pub entries: usize,
    /// Persisted entries deleted after the first save
    pub deletes: usize,
    /// Probability that the store rejects an update
    pub failure_rate: f64,
    /// Probability that a batch call fails outright
    pub transport_failure_rate: f64,
    /// Save attempts per phase before giving up
    pub max_rounds: usize,
    /// Synchronizer configuration
    pub sync: SyncConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            entries: 250,
            deletes: 40,
            failure_rate: 0.05,
            transport_failure_rate: 0.05,
            max_rounds: 50,
            sync: SyncConfig::default(),
        }
    }
}

/// Aggregated counts over all saves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// `save()` calls made
    pub saves: usize,
    /// Saves aborted by a transport failure
    pub transport_failures: usize,
    /// Batch calls received by the store
    pub round_trips: usize,
    /// Updates persisted
    pub updates_succeeded: usize,
    /// Updates rejected
    pub updates_failed: usize,
    /// Deletes acknowledged
    pub deletes_succeeded: usize,
    /// Deletes not acknowledged
    pub deletes_failed: usize,
    /// Largest delete chunk seen
    pub max_delete_chunk: usize,
    /// Largest update chunk seen
    pub max_update_chunk: usize,
}

impl SimulationStats {
    fn record(&mut self, outcome: &SaveOutcome) {
        self.updates_succeeded += outcome.updates_succeeded;
        self.updates_failed += outcome.updates_failed;
        self.deletes_succeeded += outcome.deletes_succeeded;
        self.deletes_failed += outcome.deletes_failed;
    }
}

/// Final report
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Parameters used
    pub config: SimulationConfig,
    /// Counts
    pub stats: SimulationStats,
    /// Entries still stale or deleted at the end
    pub pending: usize,
    /// Entries in the registry at the end
    pub local_entries: usize,
    /// Entries in the store at the end
    pub remote_entries: usize,
}

impl SimulationReport {
    /// Everything converged within the configured limits
    #[must_use]
    pub fn passed(&self) -> bool {
        self.pending == 0
            && self.local_entries == self.remote_entries
            && self.stats.max_delete_chunk <= self.config.sync.delete_chunk_len
            && self.stats.max_update_chunk <= self.config.sync.update_chunk_len
    }

    /// Render as text
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let s = &self.stats;

        let _ = writeln!(report, "=== tagsync simulation ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(
            report,
            "Chunk lengths: delete {} / update {}",
            self.config.sync.delete_chunk_len, self.config.sync.update_chunk_len
        );
        let _ = writeln!(report, "Saves: {}", s.saves);
        let _ = writeln!(report, "Transport failures: {}", s.transport_failures);
        let _ = writeln!(report, "Round trips: {}", s.round_trips);
        let _ = writeln!(report, "Updates succeeded: {}", s.updates_succeeded);
        let _ = writeln!(report, "Updates failed: {}", s.updates_failed);
        let _ = writeln!(report, "Deletes succeeded: {}", s.deletes_succeeded);
        let _ = writeln!(report, "Deletes failed: {}", s.deletes_failed);
        let _ = writeln!(report, "Largest chunk: delete {} / update {}", s.max_delete_chunk, s.max_update_chunk);
        let _ = writeln!(report, "Pending at end: {}", self.pending);
        let _ = writeln!(
            report,
            "Entries: local {} / remote {}",
            self.local_entries, self.remote_entries
        );
        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Framework used by the simulation
#[must_use]
pub fn simulation_framework() -> Framework {
    Framework::new(1, "simulation")
        .with_widget(
            Widget::new(
                "sector",
                "Sector",
                WidgetKind::Scale {
                    options: vec!["health".into(), "shelter".into(), "food".into()],
                },
            )
            .required(),
        )
        .with_widget(Widget::new(
            "severity",
            "Severity",
            WidgetKind::Number {
                min: Some(0.0),
                max: Some(5.0),
            },
        ))
        .with_widget(Widget::new("note", "Note", WidgetKind::Text))
}

fn random_patch(rng: &mut StdRng, order: i64) -> EntryPatch {
    let sectors = ["health", "shelter", "food"];
    let sector = sectors.choose(rng).copied().unwrap_or("health");
    let mut patch = EntryPatch::new()
        .with_order(order)
        .with_excerpt(format!("excerpt {order}"))
        .set("sector", AttributeData::Scale(sector.to_string()));
    if rng.random_bool(0.5) {
        patch = patch.set(
            "severity",
            AttributeData::Number(f64::from(rng.random_range(0..=5_u8))),
        );
    }
    patch
}

/// Run the simulation
///
/// # Errors
/// Only a failure to load the document is fatal; transport failures during
/// saves are counted and retried.
pub async fn run_simulation(config: SimulationConfig) -> Result<SimulationReport, SyncError> {
    config.sync.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let document_id = DocumentId(1);
    let store = Arc::new(InMemoryStore::new(document_id).with_random_faults(
        config.seed.wrapping_add(1),
        config.failure_rate,
        config.transport_failure_rate,
    ));

    let context =
        SessionContext::new(simulation_framework()).with_config(config.sync.clone());
    let mut session = EditingSession::new(context, store.clone(), store.clone(), document_id);
    session.load_document().await?;

    let mut stats = SimulationStats::default();

    // Phase 1: create and persist
    for i in 0..config.entries {
        let order = i64::try_from(i).unwrap_or(i64::MAX);
        session.create_entry(random_patch(&mut rng, order));
    }
    save_until_settled(&mut session, &config, &mut stats).await;

    // Phase 2: delete some, edit some, persist again
    let persisted: Vec<ClientId> = session
        .registry()
        .iter()
        .filter(|e| e.is_persisted())
        .map(|e| e.client_id.clone())
        .collect();
    for id in persisted.choose_multiple(&mut rng, config.deletes) {
        session.delete_entry(id);
    }
    let survivors: Vec<ClientId> = session
        .registry()
        .iter()
        .filter(|e| !e.deleted)
        .map(|e| e.client_id.clone())
        .collect();
    for id in survivors.iter().filter(|_| rng.random_bool(0.3)) {
        let patch = EntryPatch::new().set("note", AttributeData::Text("reviewed".into()));
        session.edit_entry(id, &patch);
    }
    save_until_settled(&mut session, &config, &mut stats).await;

    for call in store.batch_calls() {
        stats.max_delete_chunk = stats.max_delete_chunk.max(call.delete_ids.len());
        stats.max_update_chunk = stats.max_update_chunk.max(call.updates.len());
    }
    stats.round_trips = store.batch_call_count();

    let pending = session
        .registry()
        .iter()
        .filter(|e| e.save_kind().is_some())
        .count();
    let report = SimulationReport {
        config,
        stats,
        pending,
        local_entries: session.registry().len(),
        remote_entries: store.entry_count(),
    };
    info!(passed = report.passed(), "simulation finished");
    Ok(report)
}

async fn save_until_settled(
    session: &mut EditingSession,
    config: &SimulationConfig,
    stats: &mut SimulationStats,
) {
    for round in 0..config.max_rounds {
        stats.saves += 1;
        match session.save().await {
            Ok(outcome) => {
                stats.record(&outcome);
                if !session.registry().has_pending_changes() {
                    debug!(round, "settled");
                    return;
                }
            }
            Err(e) => {
                debug!(round, error = %e, "save aborted");
                stats.transport_failures += 1;
            }
        }
    }
}
