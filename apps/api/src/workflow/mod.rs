//! Per-user jobs-page workspace.
//!
//! Holds the current resume, the current job posting, the match computed from
//! them and any generated drafts. Every change to the resume or the job bumps
//! a revision counter, and a stored match is only reported while the
//! revisions it was computed from are still live.

pub mod handlers;
pub mod matching;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{ContentDraft, GenerationInput};
use crate::models::job::JobPosting;
use crate::models::resume::{ParseStatus, ParsedResume, ResumeRow};
use crate::resume;
use matching::{MatchResult, MatchSnapshot};

/// Workspaces untouched for this long are dropped on the next sweep.
pub const WORKSPACE_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Drafts kept per workspace; the oldest is dropped beyond this.
pub const MAX_DRAFTS: usize = 20;

/// Identifies the inputs a match was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchKey {
    pub resume_id: Uuid,
    pub resume_revision: u64,
    pub job_revision: u64,
}

/// The workspace's view of the user's current resume.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSlot {
    pub id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub status: ParseStatus,
    pub parse_error: Option<String>,
    pub parsed: Option<ParsedResume>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&ResumeRow> for ResumeSlot {
    fn from(row: &ResumeRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename.clone(),
            file_path: row.file_path.clone(),
            status: row.status(),
            parse_error: row.parse_error.clone(),
            parsed: row.parsed(),
            uploaded_at: row.created_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    hydrated: bool,
    resume: Option<ResumeSlot>,
    resume_revision: u64,
    job: Option<JobPosting>,
    job_revision: u64,
    stored_match: Option<(MatchKey, MatchResult)>,
    drafts: HashMap<Uuid, ContentDraft>,
}

/// Serializable snapshot returned to the client.
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    pub resume: Option<ResumeSlot>,
    pub job: Option<JobPosting>,
    pub current_match: Option<MatchResult>,
    pub drafts: Vec<ContentDraft>,
    pub credits: Option<i64>,
}

impl Workspace {
    pub fn resume(&self) -> Option<&ResumeSlot> {
        self.resume.as_ref()
    }

    pub fn job(&self) -> Option<&JobPosting> {
        self.job.as_ref()
    }

    /// Makes `slot` the current resume. Any stored match is dropped.
    pub fn set_resume(&mut self, slot: ResumeSlot) {
        self.resume = Some(slot);
        self.resume_revision += 1;
        self.stored_match = None;
    }

    /// Marks the current resume as being parsed. Ignored for superseded resumes.
    pub fn mark_parsing(&mut self, resume_id: Uuid) {
        if let Some(slot) = self.resume.as_mut().filter(|s| s.id == resume_id) {
            slot.status = ParseStatus::Parsing;
            slot.parse_error = None;
        }
    }

    /// Applies a finished parse. Returns false when `resume_id` is no longer
    /// the current resume, in which case nothing changes.
    pub fn record_parse(&mut self, resume_id: Uuid, outcome: Result<ParsedResume, String>) -> bool {
        let Some(slot) = self.resume.as_mut().filter(|s| s.id == resume_id) else {
            debug!("Ignoring parse result for superseded resume {resume_id}");
            return false;
        };
        match outcome {
            Ok(parsed) => {
                slot.status = ParseStatus::Parsed;
                slot.parse_error = None;
                slot.parsed = Some(parsed);
            }
            Err(error) => {
                slot.status = ParseStatus::Failed;
                slot.parse_error = Some(error);
                slot.parsed = None;
            }
        }
        self.resume_revision += 1;
        self.stored_match = None;
        true
    }

    /// Reconciles the workspace with the newest stored resume row. A row
    /// older than the current slot was read before a later upload and is
    /// ignored.
    pub fn sync_resume(&mut self, row: &ResumeRow) {
        if self
            .resume
            .as_ref()
            .is_some_and(|s| s.id != row.id && s.uploaded_at > row.created_at)
        {
            debug!("Ignoring stale resume row {}", row.id);
            return;
        }

        let current = self.resume.as_ref().map(|s| (s.id, s.status, s.parsed.is_some()));
        match current {
            Some((id, status, has_parsed)) if id == row.id => {
                let stored = row.status();
                if stored == status && (has_parsed || stored != ParseStatus::Parsed) {
                    return;
                }
                match (stored, row.parsed()) {
                    (ParseStatus::Parsed, Some(parsed)) => {
                        self.record_parse(row.id, Ok(parsed));
                    }
                    (ParseStatus::Failed, _) => {
                        let error = row
                            .parse_error
                            .clone()
                            .unwrap_or_else(|| "Resume parsing failed".to_string());
                        self.record_parse(row.id, Err(error));
                    }
                    _ => {}
                }
            }
            _ => self.set_resume(ResumeSlot::from(row)),
        }
    }

    /// Replaces the current job. Any stored match is dropped.
    pub fn set_job(&mut self, job: JobPosting) {
        self.job = Some(job);
        self.job_revision += 1;
        self.stored_match = None;
    }

    pub fn clear_job(&mut self) {
        self.job = None;
        self.job_revision += 1;
        self.stored_match = None;
    }

    pub fn live_key(&self) -> Option<MatchKey> {
        self.resume.as_ref().map(|slot| MatchKey {
            resume_id: slot.id,
            resume_revision: self.resume_revision,
            job_revision: self.job_revision,
        })
    }

    /// The stored match, only while its inputs are unchanged.
    pub fn current_match(&self) -> Option<&MatchResult> {
        let live = self.live_key()?;
        self.stored_match
            .as_ref()
            .filter(|(key, _)| *key == live)
            .map(|(_, result)| result)
    }

    /// Stores a match computed from `key`. A result whose inputs changed while
    /// it was in flight is discarded.
    pub fn store_match(&mut self, key: MatchKey, result: MatchResult) -> Result<(), AppError> {
        if self.live_key() != Some(key) {
            warn!("Discarding stale match result for resume {}", key.resume_id);
            return Err(AppError::Conflict(
                "Your resume or job changed while the match was running. Please run the match again."
                    .to_string(),
            ));
        }
        self.stored_match = Some((key, result));
        Ok(())
    }

    /// Inputs for a skill match. A job must be present before the resume is checked.
    pub fn match_snapshot(&self) -> Result<MatchSnapshot, AppError> {
        let job = self.job.as_ref().ok_or_else(|| {
            AppError::Validation("Extract a job posting before matching".to_string())
        })?;
        let slot = self.resume.as_ref().ok_or(AppError::ResumeNotParsed)?;
        let parsed = slot
            .parsed
            .as_ref()
            .filter(|p| slot.status == ParseStatus::Parsed && !p.skills.is_empty())
            .ok_or(AppError::ResumeNotParsed)?;
        let key = self.live_key().ok_or(AppError::ResumeNotParsed)?;

        Ok(MatchSnapshot {
            key,
            job_skills: job.skills.clone(),
            resume_skills: parsed.skills.clone(),
        })
    }

    /// Payload for a content generator: job, parsed resume and current match.
    pub fn generation_input(&self) -> Result<GenerationInput, AppError> {
        let job = self.job.as_ref().ok_or(AppError::MatchRequired)?;
        let parsed = self
            .resume
            .as_ref()
            .and_then(|s| s.parsed.as_ref())
            .ok_or(AppError::MatchRequired)?;
        let current = self.current_match().ok_or(AppError::MatchRequired)?;

        Ok(GenerationInput {
            job_data: job.to_job_data(),
            resume_data: parsed.to_resume_data(),
            skill_match_data: current.to_skill_match_data(),
        })
    }

    pub fn insert_draft(&mut self, draft: ContentDraft) {
        if self.drafts.len() >= MAX_DRAFTS {
            let oldest = self
                .drafts
                .values()
                .min_by_key(|d| d.created_at)
                .map(|d| d.id);
            if let Some(id) = oldest {
                self.drafts.remove(&id);
            }
        }
        self.drafts.insert(draft.id, draft);
    }

    pub fn remove_draft(&mut self, id: Uuid) -> bool {
        self.drafts.remove(&id).is_some()
    }

    pub fn draft(&self, id: Uuid) -> Option<&ContentDraft> {
        self.drafts.get(&id)
    }

    pub fn draft_mut(&mut self, id: Uuid) -> Option<&mut ContentDraft> {
        self.drafts.get_mut(&id)
    }

    pub fn view(&self, credits: Option<i64>) -> WorkspaceView {
        let mut drafts: Vec<ContentDraft> = self.drafts.values().cloned().collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        WorkspaceView {
            resume: self.resume.clone(),
            job: self.job.clone(),
            current_match: self.current_match().cloned(),
            drafts,
            credits,
        }
    }
}

struct Entry {
    workspace: Workspace,
    /// Milliseconds since the registry's epoch.
    touched: AtomicU64,
}

impl Entry {
    fn touch(&self, now: u64) {
        self.touched.store(now, Ordering::Relaxed);
    }
}

/// All live workspaces, keyed by user id.
///
/// Access goes through synchronous closures so the lock can never be held
/// across a remote call. Idle workspaces are swept when a new user's
/// workspace is created.
#[derive(Clone)]
pub struct WorkspaceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    epoch: Instant,
    idle_ttl: Duration,
}

impl Default for WorkspaceRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(WORKSPACE_IDLE_TTL)
    }
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            epoch: Instant::now(),
            idle_ttl,
        }
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub async fn read<R>(&self, user_id: Uuid, f: impl FnOnce(&Workspace) -> R) -> R {
        let guard = self.inner.read().await;
        match guard.get(&user_id) {
            Some(entry) => {
                entry.touch(self.now());
                f(&entry.workspace)
            }
            None => f(&Workspace::default()),
        }
    }

    pub async fn update<R>(&self, user_id: Uuid, f: impl FnOnce(&mut Workspace) -> R) -> R {
        let now = self.now();
        let mut guard = self.inner.write().await;
        if !guard.contains_key(&user_id) {
            let ttl = self.idle_ttl.as_millis() as u64;
            let before = guard.len();
            guard.retain(|_, entry| now.saturating_sub(entry.touched.load(Ordering::Relaxed)) < ttl);
            if guard.len() < before {
                debug!("Evicted {} idle workspaces", before - guard.len());
            }
        }
        let entry = guard.entry(user_id).or_insert_with(|| Entry {
            workspace: Workspace::default(),
            touched: AtomicU64::new(now),
        });
        entry.touch(now);
        f(&mut entry.workspace)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Loads the user's current resume into the workspace on first use, and
/// re-reads it while its parsed data is still missing.
pub async fn hydrate(db: &PgPool, registry: &WorkspaceRegistry, user_id: Uuid) -> Result<(), AppError> {
    let needs_reload = registry
        .read(user_id, |ws| {
            !ws.hydrated || ws.resume().is_some_and(|slot| slot.parsed.is_none())
        })
        .await;
    if !needs_reload {
        return Ok(());
    }

    let row = resume::load_current(db, user_id).await?;
    registry
        .update(user_id, |ws| {
            if let Some(row) = &row {
                ws.sync_resume(row);
            }
            ws.hydrated = true;
        })
        .await;
    Ok(())
}
