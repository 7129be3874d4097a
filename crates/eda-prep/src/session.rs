//! Sessions: one ingested file plus its transformation history.
//!
//! A [`Session`] is created from uploaded bytes and owns exactly one
//! [`TransformationEngine`]. Hosts serving several tabs keep independent
//! sessions in a [`SessionManager`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{EngineState, HistoryEntry, Operation, Preview, TransformationEngine};
use crate::error::{PrepError, Result};
use crate::ingest::{check_memory_ceiling, FileIngestor, SourceFormat};
use crate::profiler::TypeInferencer;
use crate::reporting::HistorySummary;
use crate::types::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An ingested dataset and its history.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    file_name: Option<String>,
    source_format: SourceFormat,
    engine: TransformationEngine,
}

static_assertions::assert_impl_all!(Session: Send, Sync);

impl Session {
    /// Validate `config`, decode and type `bytes`, and start a history at the
    /// resulting dataset.
    pub fn ingest(bytes: &[u8], file_name: Option<&str>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let ingested = FileIngestor::new(&config).ingest(bytes, file_name)?;
        let dataset = TypeInferencer::new(&config).infer_dataset(ingested.table)?;
        check_memory_ceiling(&dataset, &config)?;

        let mut engine = TransformationEngine::new(config);
        engine.load(dataset);

        let session = Self {
            id: SessionId::new(),
            file_name: file_name.map(str::to_string),
            source_format: ingested.format,
            engine,
        };
        info!(
            "Session {} created for {}",
            session.id,
            session.file_name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn source_format(&self) -> &SourceFormat {
        &self.source_format
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn engine(&self) -> &TransformationEngine {
        &self.engine
    }

    pub fn current_dataset(&self) -> Result<&Dataset> {
        self.engine.current_dataset()
    }

    pub fn original_dataset(&self) -> Result<&Dataset> {
        self.engine.original_dataset()
    }

    pub fn apply(&mut self, operation: Operation) -> Result<&HistoryEntry> {
        self.engine.apply(operation)
    }

    pub fn preview(&self, operation: &Operation) -> Result<Preview> {
        self.engine.preview(operation)
    }

    pub fn undo(&mut self) -> Result<&Dataset> {
        self.engine.undo()
    }

    pub fn redo(&mut self) -> Result<&Dataset> {
        self.engine.redo()
    }

    pub fn restore_original(&mut self) -> Result<&Dataset> {
        self.engine.restore_original()
    }

    /// Drop the dataset. Afterwards every data accessor fails with
    /// `NoDataLoaded`.
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub fn history_summary(&self) -> Result<HistorySummary> {
        self.engine.history_summary()
    }
}

/// Independent sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

static_assertions::assert_impl_all!(SessionManager: Send, Sync);

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a file into a new session and register it.
    pub fn create(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        config: EngineConfig,
    ) -> Result<SessionId> {
        let session = Session::ingest(bytes, file_name, config)?;
        let id = session.id();
        self.sessions.write().insert(id, Arc::new(Mutex::new(session)));
        Ok(id)
    }

    /// Run `f` with exclusive access to one session.
    ///
    /// The registry lock is released before `f` runs, so work on one session
    /// never blocks the others.
    pub fn with_session<T>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let session = self
            .sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| PrepError::SessionNotFound(id.to_string()))?;
        let mut guard = session.lock();
        Ok(f(&mut guard))
    }

    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            info!("Session {} closed", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }
}
