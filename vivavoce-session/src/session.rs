//! One live interview session
//!
//! Holds the identity and start time of a session together with its coverage
//! tracker. Elapsed time is always computed from the timestamps passed in.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use vivavoce_policy::{
    DomainCoverageTracker, DomainPick, DomainProgress, EndDecision, InterviewAttempt,
    InterviewDomain, PolicyError, Result,
};

use crate::config::SessionConfig;

/// A question the session has committed to asking
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuestion {
    /// 1-based position in the session
    pub index: u32,
    pub question_id: String,
    pub pick: DomainPick,
    pub elapsed_minutes: f64,
}

pub struct InterviewSession {
    session_id: Uuid,
    application_id: Uuid,
    candidate_id: Uuid,
    started_at: DateTime<Utc>,
    min_questions: u32,
    tracker: DomainCoverageTracker,
}

impl InterviewSession {
    pub fn new(
        config: &SessionConfig,
        application_id: Uuid,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let tracker = DomainCoverageTracker::new(config.coverage.clone())?;
        Ok(Self::with_tracker(config, application_id, candidate_id, started_at, tracker))
    }

    /// Session whose filler picks follow `seed`
    pub fn seeded(
        config: &SessionConfig,
        application_id: Uuid,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
        seed: u64,
    ) -> Result<Self> {
        let tracker = DomainCoverageTracker::seeded(config.coverage.clone(), seed)?;
        Ok(Self::with_tracker(config, application_id, candidate_id, started_at, tracker))
    }

    fn with_tracker(
        config: &SessionConfig,
        application_id: Uuid,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
        tracker: DomainCoverageTracker,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(
            "Interview session {} started for application {}",
            session_id, application_id
        );

        Self {
            session_id,
            application_id,
            candidate_id,
            started_at,
            min_questions: config.min_questions,
            tracker,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn tracker(&self) -> &DomainCoverageTracker {
        &self.tracker
    }

    /// Minutes since the session started (never negative)
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.started_at).num_milliseconds().max(0);
        elapsed as f64 / 60_000.0
    }

    /// Pick the next domain and record the question against it
    pub fn plan_next_question(&mut self, now: DateTime<Utc>) -> Result<PlannedQuestion> {
        if self.tracker.is_ended() {
            return Err(PolicyError::SessionEnded);
        }

        let pick = self.tracker.next_domain();
        let index = self.tracker.state().total_questions + 1;
        let question_id = format!("{}-q{}", self.session_id, index);
        self.tracker
            .record_domain_question(pick.domain, question_id.clone())?;

        Ok(PlannedQuestion {
            index,
            question_id,
            pick,
            elapsed_minutes: self.elapsed_minutes(now),
        })
    }

    /// Record a question chosen outside the tracker
    pub fn record_question(
        &mut self,
        domain: InterviewDomain,
        question_id: impl Into<String>,
    ) -> Result<()> {
        self.tracker.record_domain_question(domain, question_id)
    }

    pub fn end_decision(&self, now: DateTime<Utc>) -> EndDecision {
        self.tracker
            .can_end_interview(self.elapsed_minutes(now), self.min_questions)
    }

    pub fn progress(&self) -> Vec<DomainProgress> {
        self.tracker.coverage_summary()
    }

    /// Close the session and produce its immutable attempt record
    pub fn complete(
        &mut self,
        completed_at: DateTime<Utc>,
        score: f64,
        transcript_ref: Option<String>,
    ) -> Result<InterviewAttempt> {
        if self.tracker.is_ended() {
            return Err(PolicyError::SessionEnded);
        }

        let duration_seconds = (completed_at - self.started_at).num_seconds().max(0) as u64;
        let attempt = InterviewAttempt::new(
            self.session_id,
            self.application_id,
            self.candidate_id,
            completed_at,
            score,
            duration_seconds,
            self.tracker.state().total_questions,
            transcript_ref,
        )?;

        let state = self.tracker.finish();
        info!(
            "Interview session {} completed: {} questions, score {}",
            self.session_id, state.total_questions, score
        );
        Ok(attempt)
    }
}
