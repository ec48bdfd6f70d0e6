//! End-to-end interview policy scenarios
//!
//! Drives the coverage tracker through whole sessions and the retake engine
//! through full application histories.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;
use vivavoce_policy::{
    AttemptLedger, CoveragePolicy, DomainCoverageTracker, EligibilityReason, EndReason,
    InterviewAttempt, InterviewDomain, PickReason, RetakePolicy, RetakePolicyEngine,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 11, 9, 0, 0).unwrap()
}

/// Follow the tracker's own picks for `questions` questions
fn run_plan(seed: u64, questions: usize) -> DomainCoverageTracker {
    let mut tracker = DomainCoverageTracker::seeded(CoveragePolicy::default(), seed).unwrap();
    for i in 0..questions {
        let pick = tracker.next_domain();
        tracker
            .record_domain_question(pick.domain, format!("q{}", i + 1))
            .unwrap();
    }
    tracker
}

#[test]
fn test_minimums_met_with_three_technical_one_behavioral_one_architecture() {
    let mut tracker = DomainCoverageTracker::seeded(CoveragePolicy::default(), 7).unwrap();
    let asked = [
        InterviewDomain::Technical,
        InterviewDomain::Behavioral,
        InterviewDomain::Technical,
        InterviewDomain::Architecture,
        InterviewDomain::Technical,
    ];
    for (i, domain) in asked.into_iter().enumerate() {
        tracker.record_domain_question(domain, format!("q{}", i)).unwrap();
    }

    let minimum = tracker.is_minimum_coverage_met();
    assert!(minimum.is_met, "missing: {:?}", minimum.missing);
    assert!(!tracker.is_target_coverage_met());
    assert_eq!(tracker.state().total_questions, 5);
}

#[test]
fn test_hard_limit_forces_end() {
    let tracker = run_plan(1, 5);
    let decision = tracker.can_end_interview(16.0, 5);
    assert!(decision.can_end);
    assert!(decision.force_end);
    assert_eq!(decision.reason, EndReason::TimeLimitReached);

    let empty = DomainCoverageTracker::seeded(CoveragePolicy::default(), 1).unwrap();
    assert!(empty.can_end_interview(16.0, 5).force_end);
}

#[test]
fn test_followed_plan_reaches_every_minimum_first() {
    // Minimums total 5 questions; following picks fills them before anything else
    let tracker = run_plan(99, 5);
    assert!(tracker.is_minimum_coverage_met().is_met);

    let sequence = &tracker.state().domain_sequence;
    for pair in sequence.windows(2) {
        assert_ne!(pair[0], pair[1], "consecutive repeat in {:?}", sequence);
    }
}

#[test]
fn test_followed_plan_reaches_targets_then_fillers() {
    let mut tracker = run_plan(3, 11);
    assert!(tracker.is_target_coverage_met());

    let pick = tracker.next_domain();
    assert_eq!(pick.reason, PickReason::Filler);
    assert_ne!(Some(pick.domain), tracker.state().last_domain);

    assert!(!tracker.can_end_interview(9.0, 5).can_end);
    let decision = tracker.can_end_interview(10.0, 5);
    assert!(decision.can_end);
    assert_eq!(decision.reason, EndReason::TargetCoverageReached);
}

#[test]
fn test_same_seed_same_plan() {
    let a = run_plan(2024, 20);
    let b = run_plan(2024, 20);
    assert_eq!(a.state().domain_sequence, b.state().domain_sequence);
}

#[test]
fn test_finished_session_is_frozen() {
    let mut tracker = run_plan(5, 6);
    let state = tracker.finish();
    assert!(state.ended);
    assert!(tracker
        .record_domain_question(InterviewDomain::Communication, "late")
        .is_err());
    assert_eq!(tracker.state().total_questions, 6);
}

#[test]
fn test_summary_completion() {
    let tracker = run_plan(8, 5);
    let summary = tracker.coverage_summary();
    assert_eq!(summary.len(), InterviewDomain::ALL.len());

    let technical = summary
        .iter()
        .find(|p| p.domain == InterviewDomain::Technical)
        .unwrap();
    assert_eq!(technical.current, 3);
    assert!((technical.completion - 0.6).abs() < 1e-9);
}

fn attempt(application_id: Uuid, score: f64, completed_at: DateTime<Utc>) -> InterviewAttempt {
    InterviewAttempt::new(
        Uuid::new_v4(),
        application_id,
        Uuid::new_v4(),
        completed_at,
        score,
        840,
        9,
        Some(format!("transcripts/{}.json", application_id)),
    )
    .unwrap()
}

#[test]
fn test_retake_lifecycle() {
    let engine = RetakePolicyEngine::new(RetakePolicy::default()).unwrap();
    let policy = engine.policy().clone();
    let application = Uuid::new_v4();
    let mut ledger = AttemptLedger::new(application);

    let eligibility = engine.check_retake_eligibility(ledger.attempts(), start());
    assert_eq!(eligibility.reason, EligibilityReason::FirstAttempt);

    ledger.record(attempt(application, 58.0, start()), &policy).unwrap();

    let next_day = start() + Duration::hours(23);
    let eligibility = engine.check_retake_eligibility(ledger.attempts(), next_day);
    assert!(eligibility.eligible);
    assert_eq!(eligibility.window_expires_at, Some(start() + Duration::hours(24)));

    ledger.record(attempt(application, 72.0, next_day), &policy).unwrap();

    let eligibility = engine.check_retake_eligibility(ledger.attempts(), next_day);
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.reason, EligibilityReason::MaximumAttemptsUsed);

    let result = engine.calculate_final_result(ledger.attempts()).unwrap();
    assert_eq!(result.final_score, 72.0);
    assert_eq!(result.attempt_used, 2);
    assert_eq!(result.scores, vec![58.0, 72.0]);
    assert_eq!(result.improvement, Some(14.0));
}

#[test]
fn test_expired_window_after_25_hours() {
    let engine = RetakePolicyEngine::new(RetakePolicy::default()).unwrap();
    let application = Uuid::new_v4();
    let attempts = [attempt(application, 65.0, start())];

    let eligibility = engine.check_retake_eligibility(&attempts, start() + Duration::hours(25));
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.reason, EligibilityReason::RetakeWindowExpired);

    let result = engine.calculate_final_result(&attempts).unwrap();
    assert_eq!(result.final_score, 65.0);
    assert_eq!(result.attempt_used, 1);
}

#[test]
fn test_policy_round_trips_through_json() {
    let policy = CoveragePolicy::default();
    let json = serde_json::to_string(&policy).unwrap();
    let back: CoveragePolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(back, policy);

    let partial: RetakePolicy = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
    assert_eq!(partial.max_attempts, 3);
    assert_eq!(partial.retake_window_hours, 24);
}
