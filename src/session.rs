//! Per-session context: the credential gate, the analysis awaiting
//! confirmation, and the session's meal ledger.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::constants;
use crate::extractor;
use crate::gemini::{GeminiClient, GeminiError};
use crate::ledger::{Ledger, MealEntry, TargetComparison};
use crate::nutrient::{NutrientReading, NutrientTotals, TargetTable};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no API key has been provided for this session")]
    MissingCredential,
    #[error("dish name is empty")]
    EmptyDish,
    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(#[from] GeminiError),
    #[error("there is no analysis to add to the history")]
    NoPendingAnalysis,
    #[error("the analysis for {0} found no nutrient values")]
    NothingExtracted(String),
}

/// One model answer together with what could be extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub dish: String,
    pub raw_text: String,
    pub reading: NutrientReading,
}

impl Analysis {
    pub fn from_text(dish: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let reading = extractor::extract(&raw_text);
        Self {
            dish: dish.into(),
            raw_text,
            reading,
        }
    }

    /// Only analyses that found something may be logged.
    pub fn can_be_added(&self) -> bool {
        !self.reading.is_empty()
    }
}

/// Snapshot of a session's log for display.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub history: Vec<MealEntry>,
    pub totals: NutrientTotals,
    pub target: TargetTable,
    pub comparison: Vec<TargetComparison>,
}

#[derive(Debug, Default)]
pub struct Session {
    credential: Option<String>,
    pending: Option<Analysis>,
    ledger: Ledger,
}

impl Session {
    pub fn new(credential: Option<String>) -> Self {
        let mut session = Self::default();
        if let Some(key) = credential {
            session.set_credential(key);
        }
        session
    }

    /// Stores `key` unless it is blank. Returns whether the session now has a credential.
    pub fn set_credential(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        let key = key.trim();
        if !key.is_empty() {
            self.credential = Some(key.to_string());
        }
        self.has_credential()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn pending(&self) -> Option<&Analysis> {
        self.pending.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs one analysis round trip and keeps the result as the pending analysis.
    /// Any earlier pending analysis is dropped first, even if this one fails.
    #[instrument(skip(self, client))]
    pub async fn analyze(&mut self, client: &GeminiClient, dish: &str) -> Result<&Analysis, SessionError> {
        self.pending = None;
        let dish = dish.trim();
        if dish.is_empty() {
            return Err(SessionError::EmptyDish);
        }
        let key = self.credential.as_deref().ok_or(SessionError::MissingCredential)?;

        let raw_text = client.describe_dish(dish, key).await?;
        let analysis = Analysis::from_text(dish, raw_text);
        debug!(values = analysis.reading.len(), "analysis complete");
        Ok(self.pending.insert(analysis))
    }

    /// Appends the pending analysis to the ledger and clears it.
    pub fn confirm_pending(&mut self) -> Result<&MealEntry, SessionError> {
        let analysis = self.pending.take().ok_or(SessionError::NoPendingAnalysis)?;
        if !analysis.can_be_added() {
            let dish = analysis.dish.clone();
            self.pending = Some(analysis);
            return Err(SessionError::NothingExtracted(dish));
        }
        info!(dish = %analysis.dish, "adding meal to history");
        self.ledger.append(MealEntry::new(analysis.dish, analysis.reading));
        let entries = self.ledger.entries();
        Ok(&entries[entries.len() - 1])
    }

    pub fn summary(&self) -> Summary {
        let target = TargetTable::daily();
        Summary {
            history: self.ledger.entries().to_vec(),
            totals: self.ledger.totals(),
            comparison: self.ledger.compare_to_target(&target),
            target,
        }
    }
}

#[derive(Debug)]
struct StoredSession {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Sessions of the web front end, keyed by the id held in the session cookie.
/// A session that sees no request for `idle_ttl` ends, and its ledger with it.
#[derive(Debug)]
pub struct SessionStore {
    default_credential: Option<String>,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    /// New sessions start with `default_credential` when one is configured.
    /// Idle sessions expire after `NUTRILOG_SESSION_TTL_SECS`.
    pub fn new(default_credential: Option<String>) -> Self {
        Self::with_idle_ttl(default_credential, *constants::SESSION_IDLE_TTL)
    }

    pub fn with_idle_ttl(default_credential: Option<String>, idle_ttl: Duration) -> Self {
        Self {
            default_credential,
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `id`, creating a fresh one when the id is unknown,
    /// expired or absent. Expired sessions are pruned on every call.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<Session>>) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, stored| now.duration_since(stored.last_seen) < self.idle_ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "pruned idle sessions");
        }

        if let Some(id) = id {
            if let Some(stored) = sessions.get_mut(&id) {
                stored.last_seen = now;
                return (id, Arc::clone(&stored.session));
            }
        }
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(self.default_credential.clone())));
        sessions.insert(
            id,
            StoredSession {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        info!(%id, "created session");
        (id, session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
