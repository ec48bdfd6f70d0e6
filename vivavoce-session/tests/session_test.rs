//! Session configuration and lifecycle without audio hardware

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;
use vivavoce_policy::{
    AttemptLedger, EligibilityReason, EndReason, InterviewDomain, RetakePolicyEngine,
};
use vivavoce_session::{InterviewSession, SessionConfig, SessionEvent};

#[test]
fn test_missing_config_is_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = SessionConfig::load_from(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.config_path, path);
    assert_eq!(config.min_questions, 5);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[audio]"));
    assert!(written.contains("[retake]"));
}

#[test]
fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = SessionConfig::load_from(&path).unwrap();
    config.min_questions = 6;
    config.audio.chunk_samples = 2400;
    config.retake.retake_window_hours = 48;
    config.save().unwrap();

    let loaded = SessionConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[audio]\nchunk_samples = 0\n").unwrap();

    assert!(SessionConfig::load_from(&path).is_err());
}

#[test]
fn test_session_to_retake_decision() {
    let config = SessionConfig::default();
    let application = Uuid::new_v4();
    let candidate = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2026, 9, 14, 10, 0, 0).unwrap();

    let mut session =
        InterviewSession::seeded(&config, application, candidate, start, 42).unwrap();

    // One question every 50 seconds until the session may end
    let mut now = start;
    let decision = loop {
        let decision = session.end_decision(now);
        if decision.can_end {
            break decision;
        }
        let question = session.plan_next_question(now).unwrap();
        let event = SessionEvent::QuestionReady {
            index: question.index,
            question_id: question.question_id.clone(),
            domain: question.pick.domain,
            pick: question.pick,
            elapsed_minutes: question.elapsed_minutes,
        };
        assert!(event.to_json_line().unwrap().contains("question_ready"));
        now += Duration::seconds(50);
    };

    // Targets fill after eleven questions; ending waits for the 10-minute mark
    assert_eq!(decision.reason, EndReason::TargetCoverageReached);
    assert!(!decision.force_end);
    assert_eq!(session.elapsed_minutes(now), 10.0);
    assert_eq!(session.tracker().state().total_questions, 12);
    let technical = session
        .progress()
        .into_iter()
        .find(|p| p.domain == InterviewDomain::Technical)
        .unwrap();
    assert!(technical.current >= 5);

    let attempt = session.complete(now, 64.0, Some("s3://transcripts/1".to_string())).unwrap();
    assert_eq!(attempt.application_id, application);
    assert_eq!(attempt.candidate_id, candidate);

    let engine = RetakePolicyEngine::new(config.retake.clone()).unwrap();
    let mut ledger = AttemptLedger::new(application);
    ledger.record(attempt, &config.retake).unwrap();

    let eligibility = engine.check_retake_eligibility(ledger.attempts(), now + Duration::hours(2));
    assert!(eligibility.eligible);
    assert_eq!(eligibility.reason, EligibilityReason::WithinRetakeWindow);
}

#[test]
fn test_session_is_forced_to_end_at_hard_limit() {
    let config = SessionConfig::default();
    let start = Utc.with_ymd_and_hms(2026, 9, 14, 10, 0, 0).unwrap();
    let mut session =
        InterviewSession::seeded(&config, Uuid::nil(), Uuid::nil(), start, 1).unwrap();

    session.plan_next_question(start).unwrap();

    let decision = session.end_decision(start + Duration::minutes(15));
    assert!(decision.can_end);
    assert!(decision.force_end);
    assert_eq!(decision.reason, EndReason::TimeLimitReached);
}
