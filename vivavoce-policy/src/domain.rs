//! Interview question domains

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PolicyError;

/// Topical category of an interview question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewDomain {
    Technical,
    Behavioral,
    Architecture,
    ProblemSolving,
    Communication,
}

impl InterviewDomain {
    /// Every domain, in the order ties are broken when picking the next one
    pub const ALL: [InterviewDomain; 5] = [
        InterviewDomain::Technical,
        InterviewDomain::Behavioral,
        InterviewDomain::Architecture,
        InterviewDomain::ProblemSolving,
        InterviewDomain::Communication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewDomain::Technical => "technical",
            InterviewDomain::Behavioral => "behavioral",
            InterviewDomain::Architecture => "architecture",
            InterviewDomain::ProblemSolving => "problem-solving",
            InterviewDomain::Communication => "communication",
        }
    }
}

impl std::fmt::Display for InterviewDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewDomain {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        InterviewDomain::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| PolicyError::InvalidPolicy(format!("Unknown interview domain '{}'", s)))
    }
}
