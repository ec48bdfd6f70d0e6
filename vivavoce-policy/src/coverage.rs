//! Per-session domain coverage
//!
//! Tracks how many questions each domain has received against its minimum
//! and target, picks the domain to ask about next, and decides when the session
//! may end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::InterviewDomain;
use crate::error::{PolicyError, Result};

/// Question-count thresholds for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainThreshold {
    pub domain: InterviewDomain,
    pub minimum: u32,
    pub target: u32,
}

impl DomainThreshold {
    pub fn new(domain: InterviewDomain, minimum: u32, target: u32) -> Self {
        Self {
            domain,
            minimum,
            target,
        }
    }
}

/// Coverage thresholds and session-end timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveragePolicy {
    pub thresholds: Vec<DomainThreshold>,
    /// Session ends unconditionally at this point
    pub hard_limit_minutes: f64,
    /// Earliest end once every domain reached its target
    pub target_end_minutes: f64,
    /// Earliest end with only minimums met
    pub minimum_end_minutes: f64,
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                DomainThreshold::new(InterviewDomain::Technical, 3, 5),
                DomainThreshold::new(InterviewDomain::Behavioral, 1, 2),
                DomainThreshold::new(InterviewDomain::Architecture, 1, 2),
                DomainThreshold::new(InterviewDomain::ProblemSolving, 0, 1),
                DomainThreshold::new(InterviewDomain::Communication, 0, 1),
            ],
            hard_limit_minutes: 15.0,
            target_end_minutes: 10.0,
            minimum_end_minutes: 12.0,
        }
    }
}

impl CoveragePolicy {
    /// Check that every domain appears exactly once with `minimum <= target`
    /// and that the timing thresholds are ordered
    pub fn validate(&self) -> Result<()> {
        for domain in InterviewDomain::ALL {
            let count = self.thresholds.iter().filter(|t| t.domain == domain).count();
            if count != 1 {
                return Err(PolicyError::InvalidPolicy(format!(
                    "Domain {} must have exactly one threshold, found {}",
                    domain, count
                )));
            }
        }
        if let Some(t) = self.thresholds.iter().find(|t| t.minimum > t.target) {
            return Err(PolicyError::InvalidPolicy(format!(
                "Domain {} minimum ({}) exceeds target ({})",
                t.domain, t.minimum, t.target
            )));
        }
        let timings = [
            self.target_end_minutes,
            self.minimum_end_minutes,
            self.hard_limit_minutes,
        ];
        if timings.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(PolicyError::InvalidPolicy(
                "Session end thresholds must be non-negative minutes".to_string(),
            ));
        }
        if self.target_end_minutes > self.hard_limit_minutes
            || self.minimum_end_minutes > self.hard_limit_minutes
        {
            return Err(PolicyError::InvalidPolicy(
                "Early end thresholds must not exceed the hard limit".to_string(),
            ));
        }
        Ok(())
    }

    pub fn threshold(&self, domain: InterviewDomain) -> Option<&DomainThreshold> {
        self.thresholds.iter().find(|t| t.domain == domain)
    }
}

/// Coverage progress of one domain within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRequirement {
    pub domain: InterviewDomain,
    pub minimum: u32,
    pub target: u32,
    pub current: u32,
    /// Questions that counted toward this domain, in order asked
    pub question_ids: Vec<String>,
}

impl DomainRequirement {
    fn from_threshold(threshold: &DomainThreshold) -> Self {
        Self {
            domain: threshold.domain,
            minimum: threshold.minimum,
            target: threshold.target,
            current: 0,
            question_ids: Vec::new(),
        }
    }

    pub fn is_minimum_met(&self) -> bool {
        self.current >= self.minimum
    }

    pub fn is_target_met(&self) -> bool {
        self.current >= self.target
    }

    /// Questions still needed to reach the minimum
    pub fn minimum_shortfall(&self) -> u32 {
        self.minimum.saturating_sub(self.current)
    }
}

/// All coverage for one interview session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCoverageState {
    pub requirements: Vec<DomainRequirement>,
    pub total_questions: u32,
    pub last_domain: Option<InterviewDomain>,
    /// Every domain asked about, in order (append-only)
    pub domain_sequence: Vec<InterviewDomain>,
    /// Set once the session is over; the state no longer changes
    pub ended: bool,
}

impl DomainCoverageState {
    /// Fresh state with all counts at zero
    pub fn new(policy: &CoveragePolicy) -> Self {
        let requirements = InterviewDomain::ALL
            .iter()
            .filter_map(|&d| policy.threshold(d))
            .map(DomainRequirement::from_threshold)
            .collect();

        Self {
            requirements,
            total_questions: 0,
            last_domain: None,
            domain_sequence: Vec::new(),
            ended: false,
        }
    }

    pub fn requirement(&self, domain: InterviewDomain) -> Option<&DomainRequirement> {
        self.requirements.iter().find(|r| r.domain == domain)
    }

    fn requirement_mut(&mut self, domain: InterviewDomain) -> Option<&mut DomainRequirement> {
        self.requirements.iter_mut().find(|r| r.domain == domain)
    }
}

/// Why a domain was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickReason {
    BelowMinimum,
    BelowTarget,
    Filler,
}

/// Next domain to ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPick {
    pub domain: InterviewDomain,
    pub reason: PickReason,
    /// The pick repeats the previous domain because it was the only candidate
    pub repeated: bool,
}

/// A domain that has not reached its minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainShortfall {
    pub domain: InterviewDomain,
    pub needed: u32,
}

/// Result of the minimum-coverage check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumCoverage {
    pub is_met: bool,
    pub missing: Vec<DomainShortfall>,
}

/// Why the session may or may not end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    /// Hard time limit reached; coverage is irrelevant
    TimeLimitReached,
    TooFewQuestions { asked: u32, required: u32 },
    MinimumCoverageIncomplete { missing: Vec<DomainShortfall> },
    TargetCoverageReached,
    MinimumCoverageAfterGrace,
    CoverageInProgress,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::TimeLimitReached => write!(f, "time limit reached"),
            EndReason::TooFewQuestions { asked, required } => {
                write!(f, "only {} of {} required questions asked", asked, required)
            }
            EndReason::MinimumCoverageIncomplete { missing } => {
                let domains: Vec<String> = missing
                    .iter()
                    .map(|m| format!("{} (+{})", m.domain, m.needed))
                    .collect();
                write!(f, "minimum coverage missing: {}", domains.join(", "))
            }
            EndReason::TargetCoverageReached => write!(f, "all domains reached target coverage"),
            EndReason::MinimumCoverageAfterGrace => {
                write!(f, "minimum coverage met and grace period elapsed")
            }
            EndReason::CoverageInProgress => write!(f, "targets not yet reached"),
        }
    }
}

/// Result of the session-end check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndDecision {
    pub can_end: bool,
    pub force_end: bool,
    pub reason: EndReason,
}

impl EndDecision {
    fn allow(reason: EndReason) -> Self {
        Self {
            can_end: true,
            force_end: false,
            reason,
        }
    }

    fn deny(reason: EndReason) -> Self {
        Self {
            can_end: false,
            force_end: false,
            reason,
        }
    }
}

/// Progress line for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainProgress {
    pub domain: InterviewDomain,
    pub current: u32,
    pub minimum: u32,
    pub target: u32,
    /// Share of the target reached, capped at 1.0 (1.0 for a zero target)
    pub completion: f64,
}

/// Coverage state machine for a single interview session
///
/// The random source only decides filler picks; pass a seeded generator for
/// reproducible plans.
pub struct DomainCoverageTracker<R = StdRng> {
    policy: CoveragePolicy,
    state: DomainCoverageState,
    rng: R,
}

impl DomainCoverageTracker<StdRng> {
    pub fn new(policy: CoveragePolicy) -> Result<Self> {
        Self::with_rng(policy, StdRng::from_os_rng())
    }

    pub fn seeded(policy: CoveragePolicy, seed: u64) -> Result<Self> {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DomainCoverageTracker<R> {
    pub fn with_rng(policy: CoveragePolicy, rng: R) -> Result<Self> {
        policy.validate()?;
        let state = DomainCoverageState::new(&policy);
        Ok(Self { policy, state, rng })
    }

    /// Resume from a stored snapshot
    pub fn from_state(policy: CoveragePolicy, state: DomainCoverageState, rng: R) -> Result<Self> {
        policy.validate()?;
        for domain in InterviewDomain::ALL {
            if state.requirement(domain).is_none() {
                return Err(PolicyError::InvalidPolicy(format!(
                    "Coverage snapshot has no entry for {}",
                    domain
                )));
            }
        }
        Ok(Self { policy, state, rng })
    }

    pub fn policy(&self) -> &CoveragePolicy {
        &self.policy
    }

    pub fn state(&self) -> &DomainCoverageState {
        &self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state.ended
    }

    /// Count a question asked in `domain`
    pub fn record_domain_question(
        &mut self,
        domain: InterviewDomain,
        question_id: impl Into<String>,
    ) -> Result<()> {
        if self.state.ended {
            return Err(PolicyError::SessionEnded);
        }

        let question_id = question_id.into();
        let requirement = self.state.requirement_mut(domain).ok_or_else(|| {
            PolicyError::InvalidPolicy(format!("No coverage entry for {}", domain))
        })?;
        requirement.current += 1;
        requirement.question_ids.push(question_id.clone());
        let current = requirement.current;

        self.state.total_questions += 1;
        self.state.domain_sequence.push(domain);
        self.state.last_domain = Some(domain);

        debug!(
            "Recorded question {} for {} ({} in domain, {} total)",
            question_id, domain, current, self.state.total_questions
        );
        Ok(())
    }

    /// Pick the domain to ask about next
    ///
    /// Domains below their minimum come first, then domains below their
    /// target, then a random filler domain. Within each tier the previous
    /// domain is avoided; when it is the only candidate it is repeated and
    /// the pick is flagged `repeated`.
    pub fn next_domain(&mut self) -> DomainPick {
        let last = self.state.last_domain;

        let below_minimum: Vec<InterviewDomain> = self
            .state
            .requirements
            .iter()
            .filter(|r| !r.is_minimum_met())
            .map(|r| r.domain)
            .collect();
        if let Some(pick) = prefer_non_repeat(&below_minimum, last, PickReason::BelowMinimum) {
            return pick;
        }

        let below_target: Vec<InterviewDomain> = self
            .state
            .requirements
            .iter()
            .filter(|r| !r.is_target_met())
            .map(|r| r.domain)
            .collect();
        if let Some(pick) = prefer_non_repeat(&below_target, last, PickReason::BelowTarget) {
            return pick;
        }

        let fillers: Vec<InterviewDomain> = InterviewDomain::ALL
            .into_iter()
            .filter(|d| Some(*d) != last)
            .collect();
        let domain = fillers[self.rng.random_range(0..fillers.len())];
        DomainPick {
            domain,
            reason: PickReason::Filler,
            repeated: false,
        }
    }

    pub fn is_minimum_coverage_met(&self) -> MinimumCoverage {
        let missing: Vec<DomainShortfall> = self
            .state
            .requirements
            .iter()
            .filter(|r| !r.is_minimum_met())
            .map(|r| DomainShortfall {
                domain: r.domain,
                needed: r.minimum_shortfall(),
            })
            .collect();

        MinimumCoverage {
            is_met: missing.is_empty(),
            missing,
        }
    }

    pub fn is_target_coverage_met(&self) -> bool {
        self.state.requirements.iter().all(|r| r.is_target_met())
    }

    /// Decide whether the session may end after `elapsed_minutes`
    ///
    /// The hard limit forces the end regardless of coverage. Before it, the
    /// session needs `min_questions` and every minimum; it may then end once
    /// every target is met and `target_end_minutes` passed, or after
    /// `minimum_end_minutes` with minimums alone.
    pub fn can_end_interview(&self, elapsed_minutes: f64, min_questions: u32) -> EndDecision {
        if elapsed_minutes >= self.policy.hard_limit_minutes {
            return EndDecision {
                can_end: true,
                force_end: true,
                reason: EndReason::TimeLimitReached,
            };
        }

        if self.state.total_questions < min_questions {
            return EndDecision::deny(EndReason::TooFewQuestions {
                asked: self.state.total_questions,
                required: min_questions,
            });
        }

        let minimum = self.is_minimum_coverage_met();
        if !minimum.is_met {
            return EndDecision::deny(EndReason::MinimumCoverageIncomplete {
                missing: minimum.missing,
            });
        }

        if self.is_target_coverage_met() && elapsed_minutes >= self.policy.target_end_minutes {
            return EndDecision::allow(EndReason::TargetCoverageReached);
        }

        if elapsed_minutes >= self.policy.minimum_end_minutes {
            return EndDecision::allow(EndReason::MinimumCoverageAfterGrace);
        }

        EndDecision::deny(EndReason::CoverageInProgress)
    }

    /// Per-domain progress, in domain order
    pub fn coverage_summary(&self) -> Vec<DomainProgress> {
        self.state
            .requirements
            .iter()
            .map(|r| DomainProgress {
                domain: r.domain,
                current: r.current,
                minimum: r.minimum,
                target: r.target,
                completion: if r.target == 0 {
                    1.0
                } else {
                    (r.current as f64 / r.target as f64).min(1.0)
                },
            })
            .collect()
    }

    /// Mark the session over and return the final state
    pub fn finish(&mut self) -> DomainCoverageState {
        if !self.state.ended {
            self.state.ended = true;
            info!(
                "Coverage closed after {} questions: {:?}",
                self.state.total_questions, self.state.domain_sequence
            );
        }
        self.state.clone()
    }
}

fn prefer_non_repeat(
    candidates: &[InterviewDomain],
    last: Option<InterviewDomain>,
    reason: PickReason,
) -> Option<DomainPick> {
    if let Some(&domain) = candidates.iter().find(|&&d| Some(d) != last) {
        return Some(DomainPick {
            domain,
            reason,
            repeated: false,
        });
    }

    // Only the previous domain is left in this tier
    candidates.first().map(|&domain| {
        debug!("Repeating {} ({:?}): no other candidate", domain, reason);
        DomainPick {
            domain,
            reason,
            repeated: true,
        }
    })
}
