//! Sync driver
//!
//! Orchestrates the full loop per table: resume from stored state, fetch
//! pages through the retry policy, map records, emit rows to the sink, and
//! checkpoint. Checkpointing strictly follows emission for the same batch;
//! a crash between the two re-fetches that batch on the next run.
//!
//! Tables are isolated: one table exhausting its retries fails that table's
//! segment while sibling tables continue.

mod types;

#[cfg(test)]
mod tests;

pub use types::{SyncSummary, TableOutcome, TablePhase, TableStatus};

use crate::auth::{AuthConfig, Authenticator};
use crate::config::{RuntimeConfig, SyncDefinition, TableConfig, Tunables};
use crate::error::Result;
use crate::extract::extract_records;
use crate::http::{
    send_with_retry, HttpClient, HttpClientConfig, PageRequest, RateLimiterConfig,
};
use crate::mapper::RecordMapper;
use crate::pagination::{build_paginator, PageProgress, Paginator};
use crate::retry::RetryPolicy;
use crate::sink::DestinationSink;
use crate::state::{CursorState, StateStore};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-table counters accumulated during a sync
#[derive(Debug, Default)]
struct TableStats {
    pages: u64,
    rows: u64,
    skipped: u64,
    deletes: u64,
    checkpoints: u64,
}

/// Drives a full sync pass over the definition's tables
pub struct SyncDriver<S> {
    client: HttpClient,
    policy: RetryPolicy,
    store: StateStore,
    sink: S,
    definition: SyncDefinition,
    tunables: Tunables,
}

impl<S: DestinationSink> SyncDriver<S> {
    /// Build a driver from a definition and runtime config
    ///
    /// Validates the definition and config up front; no network activity
    /// happens here.
    pub fn new(
        definition: SyncDefinition,
        config: &RuntimeConfig,
        store: StateStore,
        sink: S,
    ) -> Result<Self> {
        definition.validate()?;
        let tunables = Tunables::from_config(config, &definition)?;
        let auth = AuthConfig::resolve(&definition.source.auth, config)?;

        let http_config = HttpClientConfig {
            base_url: definition.source.base_url.clone(),
            timeout: tunables.request_timeout,
            default_headers: definition.source.headers.clone(),
            rate_limit: Some(RateLimiterConfig::new(
                tunables.requests_per_second,
                tunables.requests_per_second,
            )),
            ..Default::default()
        };
        let client = HttpClient::new(http_config, Authenticator::new(auth));
        let policy = RetryPolicy::from_tunables(&tunables);

        Ok(Self {
            client,
            policy,
            store,
            sink,
            definition,
            tunables,
        })
    }

    /// Override the retry policy (tests use this to drop jitter)
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Borrow the state store
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one sync pass over all tables
    ///
    /// Never fails as a whole: per-table failures land in the summary.
    pub async fn run(&self) -> SyncSummary {
        let start = Instant::now();
        let deadline = self.tunables.deadline.map(|d| start + d);

        info!(
            definition = %self.definition.metadata.name,
            tables = self.definition.tables.len(),
            concurrency = self.tunables.table_concurrency,
            "starting sync"
        );

        let mut summary = SyncSummary::default();
        if self.tunables.table_concurrency <= 1 {
            for table in &self.definition.tables {
                summary.tables.push(self.sync_table(table, deadline).await);
            }
        } else {
            // Tables are disjoint: each worker owns its table's cursor
            // state, so no cross-table coordination is needed.
            summary.tables = stream::iter(self.definition.tables.iter())
                .map(|table| self.sync_table(table, deadline))
                .buffer_unordered(self.tunables.table_concurrency)
                .collect()
                .await;
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;
        summary.completed_at = Some(chrono::Utc::now());

        info!(
            rows = summary.total_rows(),
            skipped = summary.total_skipped(),
            failed = summary.failed().count(),
            duration_ms = summary.duration_ms,
            "sync finished"
        );
        summary
    }

    /// Sync one table, capturing any terminal error in the outcome
    async fn sync_table(&self, table: &TableConfig, deadline: Option<Instant>) -> TableOutcome {
        let start = Instant::now();
        let mut stats = TableStats::default();

        let status = match self.run_table(table, deadline, &mut stats).await {
            Ok(true) => {
                info!(
                    table = %table.name,
                    rows = stats.rows,
                    pages = stats.pages,
                    skipped = stats.skipped,
                    "table sync complete"
                );
                TableStatus::Done
            }
            Ok(false) => {
                info!(table = %table.name, "deadline reached; stopping at last checkpoint");
                TableStatus::Interrupted
            }
            Err(e) => {
                error!(
                    table = %table.name,
                    phase = %TablePhase::Failed,
                    error = %e,
                    "table sync failed ({})",
                    e.category().remediation()
                );
                TableStatus::Failed {
                    error: e.to_string(),
                    category: e.category(),
                }
            }
        };

        TableOutcome {
            table: table.name.clone(),
            status,
            pages: stats.pages,
            rows: stats.rows,
            skipped: stats.skipped,
            deletes: stats.deletes,
            checkpoints: stats.checkpoints,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The per-table state machine
    ///
    /// Returns Ok(true) when pagination ran to the end, Ok(false) when the
    /// deadline stopped it between pages.
    async fn run_table(
        &self,
        table: &TableConfig,
        deadline: Option<Instant>,
        stats: &mut TableStats,
    ) -> Result<bool> {
        debug!(table = %table.name, phase = %TablePhase::Init, "loading prior state");
        let prior = self.store.load(&table.name).await.unwrap_or_default();
        let mapper = RecordMapper::new(table);
        let paginator = build_paginator(&table.pagination, self.tunables.page_size);

        // Soft-delete tables need a complete pass to compute the key-set
        // diff, so a stored mid-sync position is not resumable for them.
        let mut progress = if table.soft_delete {
            PageProgress::new()
        } else {
            seed_progress(&prior)
        };
        let checkpoint_pages = !table.soft_delete;
        debug!(
            table = %table.name,
            phase = %TablePhase::ResumeOrStart,
            resumed = prior.has_position() && !table.soft_delete,
            "seeding paginator"
        );

        let watermark = prior.watermark.clone();
        let mut new_watermark = watermark.clone();
        let mut seen_keys: BTreeSet<String> = BTreeSet::new();

        let mut request = self.initial_request(table, &watermark, &progress, paginator.as_ref());
        let mut rows_since_checkpoint = 0usize;

        loop {
            // The deadline is only checked between pages so a table stops
            // cleanly with its last checkpoint intact.
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(false);
                }
            }

            debug!(table = %table.name, phase = %TablePhase::FetchPage, url = %request.url);
            let response = send_with_retry(&self.client, &self.policy, &request).await?;
            stats.pages += 1;

            debug!(table = %table.name, phase = %TablePhase::MapRecords);
            let records = extract_records(&response.body, table.record_path.as_deref())?;
            let mut mapped = Vec::with_capacity(records.len());
            for (index, record) in records.iter().enumerate() {
                match mapper.map(record) {
                    Ok(m) => mapped.push(m),
                    Err(e) => {
                        stats.skipped += 1;
                        warn!(
                            table = %table.name,
                            record = index,
                            page = stats.pages,
                            error = %e,
                            "skipping malformed record"
                        );
                    }
                }
            }

            debug!(table = %table.name, phase = %TablePhase::Emit, records = mapped.len());
            for m in &mapped {
                self.sink
                    .upsert(&table.name, mapper.primary_key(), m.row.clone())
                    .await?;
                stats.rows += 1;
                for child in &m.children {
                    self.sink
                        .upsert(&child.table, &child.primary_key, child.row.clone())
                        .await?;
                    stats.rows += 1;
                }

                if let Some(inc) = &table.incremental {
                    if let Some(value) = m.row.get(&inc.cursor_field).and_then(scalar_string) {
                        if new_watermark.as_deref().map_or(true, |w| value.as_str() > w) {
                            new_watermark = Some(value);
                        }
                    }
                }
                if table.soft_delete {
                    seen_keys.insert(m.key_string());
                }
                rows_since_checkpoint += 1;

                // A single page larger than the row threshold checkpoints
                // mid-page at the last page boundary, which is safe: resume
                // re-fetches the whole page.
                if checkpoint_pages && rows_since_checkpoint >= self.tunables.checkpoint_rows {
                    let cursor = cursor_from_progress(&progress, &watermark);
                    self.save_checkpoint(table, cursor, stats).await?;
                    rows_since_checkpoint = 0;
                }
            }

            let next = paginator.next_request(&response, &request, records.len(), &mut progress);

            // Checkpoint strictly follows emission of this page's rows.
            if checkpoint_pages && rows_since_checkpoint > 0 {
                let cursor = cursor_from_progress(&progress, &watermark);
                self.save_checkpoint(table, cursor, stats).await?;
                rows_since_checkpoint = 0;
            }

            match next {
                Some(n) => request = n,
                None => break,
            }
        }

        if table.soft_delete {
            if let Some(known) = &prior.known_keys {
                for key in known.difference(&seen_keys) {
                    let key_row = key_row_from_string(key, mapper.primary_key());
                    self.sink
                        .delete(&table.name, mapper.primary_key(), key_row)
                        .await?;
                    stats.deletes += 1;
                }
            }
            let cursor = CursorState {
                known_keys: Some(seen_keys),
                ..Default::default()
            };
            self.save_checkpoint(table, cursor, stats).await?;
        } else if table.incremental.is_some() {
            // Completed incremental pass: keep only the watermark so the
            // next run filters from it and paginates from the start.
            let cursor = CursorState {
                watermark: new_watermark,
                ..Default::default()
            };
            self.save_checkpoint(table, cursor, stats).await?;
        }

        debug!(table = %table.name, phase = %TablePhase::Done);
        Ok(true)
    }

    /// Build the first request of a (possibly resumed) table run
    fn initial_request(
        &self,
        table: &TableConfig,
        watermark: &Option<String>,
        progress: &PageProgress,
        paginator: &dyn Paginator,
    ) -> PageRequest {
        let mut request = PageRequest {
            method: table.method,
            url: table.endpoint.clone(),
            ..Default::default()
        };
        for (key, value) in &self.definition.source.params {
            request = request.query(key, value);
        }
        for (key, value) in &table.params {
            request = request.query(key, value);
        }
        for (key, value) in &table.headers {
            request = request.header(key, value);
        }
        if let Some(inc) = &table.incremental {
            if let Some(watermark) = watermark {
                request = request.query(&inc.cursor_param, watermark);
            }
        }

        for (key, value) in paginator.initial_params(progress) {
            request = request.query(key, value);
        }
        if let Some(url) = &progress.next_url {
            request = request.with_url(url.clone());
        }
        request
    }

    /// Persist cursor state, then hand the state blob to the sink
    async fn save_checkpoint(
        &self,
        table: &TableConfig,
        cursor: CursorState,
        stats: &mut TableStats,
    ) -> Result<()> {
        debug!(table = %table.name, phase = %TablePhase::Checkpoint, cursor = ?cursor);
        self.store.save(&table.name, cursor).await?;
        let snapshot = self.store.snapshot().await;
        self.sink.checkpoint(&snapshot).await?;
        stats.checkpoints += 1;
        Ok(())
    }
}

/// Seed pagination progress from stored cursor state
fn seed_progress(prior: &CursorState) -> PageProgress {
    PageProgress {
        cursor: prior.cursor.clone(),
        offset: prior.offset.unwrap_or(0),
        page: prior.page.unwrap_or(0),
        next_url: prior.next_url.clone(),
        ..Default::default()
    }
}

/// Capture the current pagination position as cursor state
fn cursor_from_progress(progress: &PageProgress, watermark: &Option<String>) -> CursorState {
    CursorState {
        cursor: progress.cursor.clone(),
        offset: (progress.offset > 0).then_some(progress.offset),
        page: (progress.page > 0).then_some(progress.page),
        next_url: progress.next_url.clone(),
        watermark: watermark.clone(),
        known_keys: None,
    }
}

/// Rebuild a primary-key row from its rendered key string
fn key_row_from_string(key: &str, primary_key: &[String]) -> crate::mapper::FlatRow {
    let mut row = crate::mapper::FlatRow::new();
    if primary_key.len() == 1 {
        row.insert(
            primary_key[0].clone(),
            serde_json::Value::String(key.to_string()),
        );
    } else {
        for (column, part) in primary_key.iter().zip(key.splitn(primary_key.len(), ':')) {
            row.insert(column.clone(), serde_json::Value::String(part.to_string()));
        }
    }
    row
}

fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
