//! Vivavoce Interview Policy
//!
//! Pure decision logic for a live interview:
//!
//! - [`DomainCoverageTracker`] picks the next question domain and decides
//!   when a session may (or must) end.
//! - [`RetakePolicyEngine`] decides whether a candidate may retake an
//!   interview and which attempt counts.
//!
//! Nothing here does I/O. Time is passed in by the caller.

pub mod coverage;
pub mod domain;
pub mod error;
pub mod retake;

pub use coverage::{
    CoveragePolicy, DomainCoverageState, DomainCoverageTracker, DomainPick, DomainProgress,
    DomainRequirement, DomainShortfall, DomainThreshold, EndDecision, EndReason, MinimumCoverage,
    PickReason,
};
pub use domain::InterviewDomain;
pub use error::{PolicyError, Result};
pub use retake::{
    AttemptLedger, EligibilityReason, InterviewAttempt, InterviewResult, RetakeEligibility,
    RetakePolicy, RetakePolicyEngine,
};
