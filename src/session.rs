use std::path::Path;

use crate::commit::{commit_in_batches, BatchProgress};
use crate::db::CaptacaoStore;
use crate::dedup::partition_new;
use crate::error::{CaptaError, Result};
use crate::mapping::{self, ColumnMapping};
use crate::models::{NormalizedRecord, RawRow, UploadResult};
use crate::normalize::normalize_rows;
use crate::workbook::parse_file;

/// Where one upload currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    FileSelected,
    MappingProposed,
    MappingConfirmed,
    Validated,
    DuplicatesChecked,
    AwaitingConfirmation,
    Committing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEvent {
    FileChosen,
    MappingResolved,
    MappingConfirmed,
    RowsValidated,
    DuplicatesResolved,
    ConfirmationRequested,
    CommitStarted,
    CommitFinished,
    Failed,
    Cancelled,
    Dismissed,
}

/// The full transition table. Pure, so every edge is testable without
/// touching a file or a database.
pub fn transition(state: IngestState, event: IngestEvent) -> Result<IngestState> {
    use IngestEvent as E;
    use IngestState as S;
    let next = match (state, event) {
        (S::Idle, E::FileChosen) => S::FileSelected,
        (S::FileSelected, E::MappingResolved) => S::MappingProposed,
        (S::MappingProposed, E::MappingConfirmed) => S::MappingConfirmed,
        (S::MappingConfirmed, E::RowsValidated) => S::Validated,
        (S::Validated, E::DuplicatesResolved) => S::DuplicatesChecked,
        (S::DuplicatesChecked, E::ConfirmationRequested) => S::AwaitingConfirmation,
        (S::AwaitingConfirmation, E::CommitStarted) => S::Committing,
        // the one abandonment point with no side effects
        (S::AwaitingConfirmation, E::Cancelled) => S::Idle,
        (S::Committing, E::CommitFinished) => S::Completed,
        (S::FileSelected | S::MappingConfirmed | S::Committing, E::Failed) => S::Failed,
        (S::Completed | S::Failed, E::Dismissed) => S::Idle,
        (state, event) => {
            return Err(CaptaError::InvalidTransition(format!(
                "{event:?} while {state:?}"
            )))
        }
    };
    Ok(next)
}

/// Transient state for one upload, from file selection to the final
/// result. Exclusively owned by one pipeline run; dropped on cancel,
/// dismissal or completion.
pub struct IngestionSession {
    state: IngestState,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub mappings: Vec<ColumnMapping>,
    /// Validated candidates; after the duplicate check, only the rows
    /// not yet persisted.
    pub records: Vec<NormalizedRecord>,
    pub validation_errors: Vec<String>,
    rejected_rows: usize,
    pub duplicate_count: usize,
    pub duplicate_sample: Vec<String>,
}

impl IngestionSession {
    pub fn new() -> Self {
        IngestionSession {
            state: IngestState::Idle,
            headers: Vec::new(),
            rows: Vec::new(),
            mappings: Vec::new(),
            records: Vec::new(),
            validation_errors: Vec::new(),
            rejected_rows: 0,
            duplicate_count: 0,
            duplicate_sample: Vec::new(),
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    fn apply(&mut self, event: IngestEvent) -> Result<()> {
        self.state = transition(self.state, event)?;
        Ok(())
    }

    /// Decode the file and propose a column mapping. An unreadable or
    /// empty workbook is fatal to the session.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        self.apply(IngestEvent::FileChosen)?;
        match parse_file(path) {
            Ok(sheet) => {
                self.mappings = mapping::propose_mappings(&sheet.headers);
                self.headers = sheet.headers;
                self.rows = sheet.rows;
                self.apply(IngestEvent::MappingResolved)
            }
            Err(e) => {
                self.apply(IngestEvent::Failed)?;
                Err(e)
            }
        }
    }

    /// Operator override: bind a source column to a target field.
    pub fn map_column(&mut self, source: &str, key: &str) -> Result<()> {
        self.ensure(IngestState::MappingProposed)?;
        mapping::assign(&mut self.mappings, source, key)
    }

    /// Operator override: drop a proposed mapping.
    pub fn unmap_column(&mut self, source: &str) -> Result<()> {
        self.ensure(IngestState::MappingProposed)?;
        mapping::unassign(&mut self.mappings, source)
    }

    /// Lock the mapping in. Fails, without changing state, while any
    /// required field is unmapped.
    pub fn confirm_mapping(&mut self) -> Result<()> {
        self.ensure(IngestState::MappingProposed)?;
        mapping::validate_mappings(&self.mappings)?;
        self.apply(IngestEvent::MappingConfirmed)
    }

    /// Run every row through coercion. Zero surviving rows is fatal.
    pub fn validate_rows(&mut self) -> Result<()> {
        self.ensure(IngestState::MappingConfirmed)?;
        let outcome = normalize_rows(&self.rows, &self.mappings);
        self.records = outcome.records;
        self.validation_errors = outcome.errors;
        self.rejected_rows = outcome.rejected_rows;
        if self.records.is_empty() {
            self.apply(IngestEvent::Failed)?;
            return Err(CaptaError::NoValidRows);
        }
        self.apply(IngestEvent::RowsValidated)
    }

    /// Split candidates into new vs. already persisted, then suspend
    /// for the operator's final confirmation.
    pub fn check_duplicates(&mut self, store: &dyn CaptacaoStore) -> Result<()> {
        self.ensure(IngestState::Validated)?;
        let outcome = partition_new(store, std::mem::take(&mut self.records))?;
        self.records = outcome.new_records;
        self.duplicate_count = outcome.duplicate_count;
        self.duplicate_sample = outcome.duplicate_sample;
        self.apply(IngestEvent::DuplicatesResolved)?;
        self.apply(IngestEvent::ConfirmationRequested)
    }

    /// Abandon the upload before anything was written.
    pub fn cancel(&mut self) -> Result<()> {
        self.apply(IngestEvent::Cancelled)?;
        *self = IngestionSession::new();
        Ok(())
    }

    /// Commit the new rows in batches and assemble the final summary.
    /// Always returns the summary; the session lands in `Failed` when
    /// every batch was rejected.
    pub fn commit(
        &mut self,
        store: &mut dyn CaptacaoStore,
        chunk_size: usize,
        on_batch_complete: impl FnMut(BatchProgress),
    ) -> Result<UploadResult> {
        self.apply(IngestEvent::CommitStarted)?;
        let outcome = commit_in_batches(store, &self.records, chunk_size, on_batch_complete);

        let mut errors = self.validation_errors.clone();
        errors.extend(outcome.errors.iter().cloned());
        let result = UploadResult {
            total_rows: self.rows.len(),
            inserted: outcome.inserted,
            duplicates_ignored: self.duplicate_count,
            duplicate_sample: self.duplicate_sample.clone(),
            errors,
            error_rows: self.rejected_rows + outcome.failed_rows,
        };

        if outcome.is_total_failure() {
            self.apply(IngestEvent::Failed)?;
        } else {
            self.apply(IngestEvent::CommitFinished)?;
        }
        Ok(result)
    }

    /// Reset to Idle after the operator has seen the result.
    pub fn dismiss(&mut self) -> Result<()> {
        self.apply(IngestEvent::Dismissed)?;
        *self = IngestionSession::new();
        Ok(())
    }

    fn ensure(&self, expected: IngestState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptaError::InvalidTransition(format!(
                "expected {expected:?}, session is {:?}",
                self.state
            )))
        }
    }
}

impl Default for IngestionSession {
    fn default() -> Self {
        Self::new()
    }
}
