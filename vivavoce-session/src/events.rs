use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vivavoce_policy::{DomainPick, EndDecision, InterviewDomain};

/// Events emitted on the JSON-lines stream
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Capture or simulation started
    #[serde(rename = "session_start")]
    SessionStart {
        session_id: Uuid,
        timestamp: f64,
    },

    /// One wire-ready PCM16 chunk
    #[serde(rename = "audio_chunk")]
    AudioChunk {
        seq: u64,
        sample_rate: u32,
        samples: usize,
        /// Little-endian PCM16, base64 standard alphabet
        audio: String,
    },

    /// Input level reading in [0, 1]
    #[serde(rename = "input_level")]
    InputLevel {
        level: f32,
        timestamp: f64,
    },

    /// Next question domain chosen
    #[serde(rename = "question_ready")]
    QuestionReady {
        index: u32,
        question_id: String,
        domain: InterviewDomain,
        pick: DomainPick,
        elapsed_minutes: f64,
    },

    /// Session over
    #[serde(rename = "session_end")]
    SessionEnd {
        session_id: Uuid,
        timestamp: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        decision: Option<EndDecision>,
        chunks: u64,
    },

    /// Capture or policy failure
    #[serde(rename = "error")]
    Error {
        message: String,
    },
}

impl SessionEvent {
    /// Convert event to JSON string with newline
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Seconds since the Unix epoch
pub fn unix_timestamp(time: std::time::SystemTime) -> f64 {
    time.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
