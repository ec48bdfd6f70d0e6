//! Retake eligibility and final results
//!
//! Everything here is derived from the list of completed attempts for one
//! application and recomputed on every call. Nothing derived is stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PolicyError, Result};

/// Retake rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetakePolicy {
    /// Attempts allowed per application (first try included)
    pub max_attempts: usize,
    /// Hours after the first attempt during which a retake may start
    pub retake_window_hours: i64,
}

impl Default for RetakePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retake_window_hours: 24,
        }
    }
}

impl RetakePolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(PolicyError::InvalidPolicy(
                "At least one attempt must be allowed".to_string(),
            ));
        }
        if self.retake_window_hours < 0 {
            return Err(PolicyError::InvalidPolicy(
                "Retake window cannot be negative".to_string(),
            ));
        }
        if self.retake_window().is_none() {
            return Err(PolicyError::InvalidPolicy(format!(
                "Retake window of {} hours is too large",
                self.retake_window_hours
            )));
        }
        Ok(())
    }

    /// Window length, or `None` when the hour count does not fit a duration
    pub fn retake_window(&self) -> Option<Duration> {
        Duration::try_hours(self.retake_window_hours)
    }
}

/// A completed interview session
///
/// Created once when a session finishes and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAttempt {
    pub session_id: Uuid,
    pub application_id: Uuid,
    pub candidate_id: Uuid,
    pub completed_at: DateTime<Utc>,
    /// Score in [0, 100]
    pub score: f64,
    pub duration_seconds: u64,
    pub question_count: u32,
    /// Pointer to the stored transcript, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_ref: Option<String>,
}

impl InterviewAttempt {
    /// Build an attempt, rejecting scores outside [0, 100]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: Uuid,
        application_id: Uuid,
        candidate_id: Uuid,
        completed_at: DateTime<Utc>,
        score: f64,
        duration_seconds: u64,
        question_count: u32,
        transcript_ref: Option<String>,
    ) -> Result<Self> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(PolicyError::ScoreOutOfRange(score));
        }

        Ok(Self {
            session_id,
            application_id,
            candidate_id,
            completed_at,
            score,
            duration_seconds,
            question_count,
            transcript_ref,
        })
    }
}

/// Why a retake is or is not allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    FirstAttempt,
    WithinRetakeWindow,
    MaximumAttemptsUsed,
    RetakeWindowExpired,
}

impl std::fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EligibilityReason::FirstAttempt => write!(f, "first attempt available"),
            EligibilityReason::WithinRetakeWindow => write!(f, "retake available within window"),
            EligibilityReason::MaximumAttemptsUsed => write!(f, "maximum attempts used"),
            EligibilityReason::RetakeWindowExpired => write!(f, "retake window expired"),
        }
    }
}

/// Derived retake view for one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetakeEligibility {
    pub eligible: bool,
    pub reason: EligibilityReason,
    pub attempts_used: usize,
    pub attempts_remaining: usize,
    /// End of the retake window, once a first attempt exists
    ///
    /// `None` after a first attempt means the window ends past the latest
    /// representable date and never expires.
    pub window_expires_at: Option<DateTime<Utc>>,
    /// Whole seconds left in the retake window (zero once expired)
    pub seconds_remaining: Option<i64>,
}

impl RetakeEligibility {
    pub fn time_remaining(&self) -> Option<Duration> {
        self.seconds_remaining.map(Duration::seconds)
    }
}

/// Derived final outcome for one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewResult {
    /// Best score across attempts
    pub final_score: f64,
    /// 1-based index of the attempt that produced `final_score`
    pub attempt_used: usize,
    pub total_attempts: usize,
    pub scores: Vec<f64>,
    /// Last score minus first score, with two or more attempts
    pub improvement: Option<f64>,
    pub best_session_id: Uuid,
}

/// Retake rules evaluated over an application's attempts
///
/// Attempt lists are taken in completion order.
#[derive(Debug, Clone, Default)]
pub struct RetakePolicyEngine {
    policy: RetakePolicy,
}

impl RetakePolicyEngine {
    pub fn new(policy: RetakePolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RetakePolicy {
        &self.policy
    }

    /// Whether another attempt may start at `now`
    ///
    /// No attempts: eligible. At the attempt cap: not eligible. Otherwise a
    /// retake is allowed while `now` is within the window opened by the first
    /// attempt (inclusive of its last instant).
    pub fn check_retake_eligibility(
        &self,
        attempts: &[InterviewAttempt],
        now: DateTime<Utc>,
    ) -> RetakeEligibility {
        let used = attempts.len();
        let remaining = self.policy.max_attempts.saturating_sub(used);

        let Some(first) = attempts.first() else {
            return RetakeEligibility {
                eligible: true,
                reason: EligibilityReason::FirstAttempt,
                attempts_used: 0,
                attempts_remaining: remaining,
                window_expires_at: None,
                seconds_remaining: None,
            };
        };

        let expires_at = self
            .policy
            .retake_window()
            .and_then(|window| first.completed_at.checked_add_signed(window));
        let seconds_left = expires_at.map(|at| (at - now).num_seconds().max(0));

        let (eligible, reason) = if remaining == 0 {
            (false, EligibilityReason::MaximumAttemptsUsed)
        } else if expires_at.is_none_or(|at| now <= at) {
            (true, EligibilityReason::WithinRetakeWindow)
        } else {
            (false, EligibilityReason::RetakeWindowExpired)
        };

        debug!(
            "Retake check for application {}: {} ({} used, {:?}s left)",
            first.application_id, reason, used, seconds_left
        );

        RetakeEligibility {
            eligible,
            reason,
            attempts_used: used,
            attempts_remaining: if eligible { remaining } else { 0 },
            window_expires_at: expires_at,
            seconds_remaining: seconds_left,
        }
    }

    /// Final score: the best attempt, earliest one on ties
    pub fn calculate_final_result(&self, attempts: &[InterviewAttempt]) -> Result<InterviewResult> {
        let first = attempts.first().ok_or(PolicyError::NoAttempts)?;

        let mut best_index = 0;
        for (index, attempt) in attempts.iter().enumerate().skip(1) {
            if attempt.score > attempts[best_index].score {
                best_index = index;
            }
        }
        let best = &attempts[best_index];

        let improvement = match attempts.last() {
            Some(last) if attempts.len() > 1 => Some(last.score - first.score),
            _ => None,
        };

        Ok(InterviewResult {
            final_score: best.score,
            attempt_used: best_index + 1,
            total_attempts: attempts.len(),
            scores: attempts.iter().map(|a| a.score).collect(),
            improvement,
            best_session_id: best.session_id,
        })
    }
}

/// Append-only attempt list for one application
///
/// Enforces the attempt cap, application identity and completion order so the
/// list can be stored verbatim and handed back to [`RetakePolicyEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptLedger {
    application_id: Uuid,
    attempts: Vec<InterviewAttempt>,
}

impl AttemptLedger {
    pub fn new(application_id: Uuid) -> Self {
        Self {
            application_id,
            attempts: Vec::new(),
        }
    }

    pub fn application_id(&self) -> Uuid {
        self.application_id
    }

    pub fn attempts(&self) -> &[InterviewAttempt] {
        &self.attempts
    }

    /// Record a finished attempt
    pub fn record(&mut self, attempt: InterviewAttempt, policy: &RetakePolicy) -> Result<()> {
        if attempt.application_id != self.application_id {
            return Err(PolicyError::ApplicationMismatch {
                expected: self.application_id,
                got: attempt.application_id,
            });
        }
        if self.attempts.len() >= policy.max_attempts {
            return Err(PolicyError::AttemptLimitReached {
                max: policy.max_attempts,
            });
        }
        if let Some(previous) = self.attempts.last() {
            if attempt.completed_at < previous.completed_at {
                return Err(PolicyError::AttemptOutOfOrder);
            }
        }

        debug!(
            "Recorded attempt {} for application {} (score {})",
            self.attempts.len() + 1,
            self.application_id,
            attempt.score
        );
        self.attempts.push(attempt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn attempt(score: f64, completed_at: DateTime<Utc>) -> InterviewAttempt {
        InterviewAttempt::new(
            Uuid::new_v4(),
            Uuid::nil(),
            Uuid::nil(),
            completed_at,
            score,
            900,
            8,
            None,
        )
        .unwrap()
    }

    fn engine() -> RetakePolicyEngine {
        RetakePolicyEngine::new(RetakePolicy::default()).unwrap()
    }

    #[test]
    fn test_first_attempt_is_eligible() {
        let eligibility = engine().check_retake_eligibility(&[], now());
        assert!(eligibility.eligible);
        assert_eq!(eligibility.reason, EligibilityReason::FirstAttempt);
        assert_eq!(eligibility.attempts_remaining, 2);
        assert!(eligibility.window_expires_at.is_none());
    }

    #[test]
    fn test_retake_inside_window() {
        let attempts = [attempt(70.0, now() - Duration::hours(23))];
        let eligibility = engine().check_retake_eligibility(&attempts, now());
        assert!(eligibility.eligible);
        assert_eq!(eligibility.reason, EligibilityReason::WithinRetakeWindow);
        assert_eq!(eligibility.attempts_remaining, 1);
        assert_eq!(eligibility.seconds_remaining, Some(3600));
        assert_eq!(eligibility.time_remaining(), Some(Duration::hours(1)));
    }

    #[test]
    fn test_retake_window_expired() {
        let attempts = [attempt(70.0, now() - Duration::hours(25))];
        let eligibility = engine().check_retake_eligibility(&attempts, now());
        assert!(!eligibility.eligible);
        assert_eq!(eligibility.reason, EligibilityReason::RetakeWindowExpired);
        assert_eq!(eligibility.seconds_remaining, Some(0));
        assert_eq!(eligibility.attempts_remaining, 0);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let attempts = [attempt(70.0, now() - Duration::hours(24))];
        assert!(engine().check_retake_eligibility(&attempts, now()).eligible);

        let late = now() + Duration::seconds(1);
        assert!(!engine().check_retake_eligibility(&attempts, late).eligible);
    }

    #[test]
    fn test_window_past_calendar_end_never_expires() {
        let engine = RetakePolicyEngine::new(RetakePolicy {
            max_attempts: 2,
            retake_window_hours: 3_000_000_000,
        })
        .unwrap();

        let attempts = [attempt(70.0, now())];
        let eligibility = engine.check_retake_eligibility(&attempts, now() + Duration::days(3650));
        assert!(eligibility.eligible);
        assert_eq!(eligibility.reason, EligibilityReason::WithinRetakeWindow);
        assert_eq!(eligibility.window_expires_at, None);
        assert_eq!(eligibility.seconds_remaining, None);
    }

    #[test]
    fn test_attempt_near_latest_date() {
        let completed_at = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        let attempts = [attempt(70.0, completed_at)];
        let eligibility = engine().check_retake_eligibility(&attempts, completed_at);
        assert!(eligibility.eligible);
        assert_eq!(eligibility.window_expires_at, None);
    }

    #[test]
    fn test_oversized_window_rejected() {
        let policy = RetakePolicy {
            max_attempts: 2,
            retake_window_hours: i64::MAX,
        };
        assert!(matches!(policy.validate(), Err(PolicyError::InvalidPolicy(_))));
        assert!(RetakePolicyEngine::new(policy).is_err());
    }

    #[test]
    fn test_maximum_attempts_used() {
        let attempts = [
            attempt(60.0, now() - Duration::hours(3)),
            attempt(65.0, now() - Duration::hours(1)),
        ];
        let eligibility = engine().check_retake_eligibility(&attempts, now());
        assert!(!eligibility.eligible);
        assert_eq!(eligibility.reason, EligibilityReason::MaximumAttemptsUsed);
    }

    #[test]
    fn test_final_result_keeps_best_score() {
        let engine = engine();
        let attempts = [attempt(65.0, now()), attempt(58.0, now())];
        let result = engine.calculate_final_result(&attempts).unwrap();
        assert_eq!(result.final_score, 65.0);
        assert_eq!(result.attempt_used, 1);
        assert_eq!(result.improvement, Some(-7.0));

        let attempts = [attempt(58.0, now()), attempt(72.0, now())];
        let result = engine.calculate_final_result(&attempts).unwrap();
        assert_eq!(result.final_score, 72.0);
        assert_eq!(result.attempt_used, 2);
        assert_eq!(result.improvement, Some(14.0));
        assert_eq!(result.best_session_id, attempts[1].session_id);
    }

    #[test]
    fn test_tie_goes_to_earlier_attempt() {
        let attempts = [attempt(80.0, now()), attempt(80.0, now())];
        let result = engine().calculate_final_result(&attempts).unwrap();
        assert_eq!(result.attempt_used, 1);
    }

    #[test]
    fn test_single_attempt_has_no_improvement() {
        let result = engine().calculate_final_result(&[attempt(50.0, now())]).unwrap();
        assert_eq!(result.final_score, 50.0);
        assert_eq!(result.improvement, None);
    }

    #[test]
    fn test_empty_attempts_rejected() {
        assert_eq!(engine().calculate_final_result(&[]), Err(PolicyError::NoAttempts));
    }

    #[test]
    fn test_score_validation() {
        let make = |score| {
            InterviewAttempt::new(Uuid::nil(), Uuid::nil(), Uuid::nil(), now(), score, 0, 0, None)
        };
        assert!(make(0.0).is_ok());
        assert!(make(100.0).is_ok());
        assert_eq!(make(100.5), Err(PolicyError::ScoreOutOfRange(100.5)));
        assert!(make(-1.0).is_err());
        assert!(make(f64::NAN).is_err());
    }

    #[test]
    fn test_ledger_rules() {
        let policy = RetakePolicy::default();
        let mut ledger = AttemptLedger::new(Uuid::nil());

        ledger.record(attempt(60.0, now()), &policy).unwrap();
        assert_eq!(
            ledger.record(attempt(70.0, now() - Duration::hours(1)), &policy),
            Err(PolicyError::AttemptOutOfOrder)
        );

        let mut other = attempt(70.0, now());
        other.application_id = Uuid::new_v4();
        assert!(matches!(
            ledger.record(other, &policy),
            Err(PolicyError::ApplicationMismatch { .. })
        ));

        ledger.record(attempt(70.0, now() + Duration::hours(2)), &policy).unwrap();
        assert_eq!(
            ledger.record(attempt(75.0, now() + Duration::hours(3)), &policy),
            Err(PolicyError::AttemptLimitReached { max: 2 })
        );
        assert_eq!(ledger.attempts().len(), 2);
    }

    #[test]
    fn test_attempt_serialization() {
        let attempt = attempt(88.5, now());
        let json = serde_json::to_string(&attempt).unwrap();
        assert!(!json.contains("transcript_ref"));
        let back: InterviewAttempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
    }
}
