//! Vivavoce - live interview session core
//!
//! `devices` lists microphones, `live` streams wire-ready audio as JSON lines,
//! `plan` simulates a session's domain plan and `retake` evaluates an attempt
//! history. Events go to stdout, logs to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, Level};
use uuid::Uuid;

use vivavoce_audio::{AudioProcessor, CpalCapture, Pcm16Chunk};
use vivavoce_policy::{
    AttemptLedger, InterviewAttempt, InterviewResult, RetakeEligibility, RetakePolicyEngine,
};
use vivavoce_session::events::unix_timestamp;
use vivavoce_session::{InterviewSession, SessionConfig, SessionEvent};

/// Vivavoce interview session CLI
#[derive(Parser, Debug)]
#[command(name = "vivavoce", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/vivavoce/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available input devices
    Devices,

    /// Capture the microphone and stream PCM16 chunks as JSON lines
    Live {
        /// Stop after this many seconds (Ctrl-C stops early)
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },

    /// Simulate a session's domain plan
    Plan {
        /// Questions to plan
        #[arg(short, long, default_value_t = 8)]
        questions: u32,

        /// Seed for filler domain picks
        #[arg(long)]
        seed: Option<u64>,

        /// Simulated minutes spent per question
        #[arg(short, long, default_value_t = 1.5)]
        minutes_per_question: f64,
    },

    /// Evaluate retake eligibility and final score from an attempt history
    Retake {
        /// JSON array of attempts, oldest first
        #[arg(short, long)]
        attempts: PathBuf,

        /// Evaluation time (RFC 3339, default: now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config = match &cli.config {
        Some(path) => SessionConfig::load_from(path),
        None => SessionConfig::load(),
    }
    .context("Failed to load configuration")?;

    info!("Configuration loaded from {}", config.config_path.display());

    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Live { seconds } => run_live(&config, seconds).await,
        Commands::Plan {
            questions,
            seed,
            minutes_per_question,
        } => run_plan(&config, questions, seed, minutes_per_question).await,
        Commands::Retake { attempts, now } => {
            run_retake(&config, &attempts, now.unwrap_or_else(Utc::now))
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = CpalCapture::list_devices().context("Failed to list input devices")?;

    println!("Available input devices:");
    for device in devices {
        println!(
            "  [{}] {}{} ({} ch, {} Hz)",
            device.index,
            device.name,
            if device.is_default { " (default)" } else { "" },
            device.max_input_channels,
            device.default_sample_rate
        );
    }
    Ok(())
}

fn chunk_event(seq: u64, chunk: &Pcm16Chunk) -> SessionEvent {
    SessionEvent::AudioChunk {
        seq,
        sample_rate: chunk.sample_rate,
        samples: chunk.len(),
        audio: chunk.to_base64(),
    }
}

/// Write events to stdout until every sender is gone
fn spawn_writer(
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = rx.recv().await {
            let line = event.to_json_line().context("Failed to serialize event")?;
            stdout
                .write_all(line.as_bytes())
                .await
                .context("Failed to write event")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
        Ok(())
    })
}

async fn run_live(config: &SessionConfig, seconds: u64) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = spawn_writer(rx);

    let session_id = Uuid::new_v4();
    let seq = Arc::new(AtomicU64::new(0));

    let mut processor =
        AudioProcessor::new(config.audio.clone()).context("Invalid audio configuration")?;

    {
        let tx = tx.clone();
        let seq = Arc::clone(&seq);
        processor.set_chunk_callback(move |chunk| {
            let n = seq.fetch_add(1, Ordering::Relaxed);
            let _ = tx.send(chunk_event(n, &chunk));
        });
    }
    {
        let tx = tx.clone();
        processor.set_level_callback(move |sample| {
            let _ = tx.send(SessionEvent::InputLevel {
                level: sample.level,
                timestamp: unix_timestamp(sample.timestamp),
            });
        });
    }
    {
        let tx = tx.clone();
        processor.set_error_callback(move |e| {
            let _ = tx.send(SessionEvent::Error {
                message: e.to_string(),
            });
        });
    }

    let _ = tx.send(SessionEvent::SessionStart {
        session_id,
        timestamp: unix_timestamp(std::time::SystemTime::now()),
    });

    let mut capture = CpalCapture::new(&config.audio);
    if let Err(e) = processor.start(&mut capture) {
        error!("Failed to start capture: {}", e);
        drop(processor);
        drop(tx);
        let _ = writer.await;
        return Err(e).context("Failed to start capture");
    }

    info!("Streaming for up to {} s (Ctrl-C to stop)", seconds);

    tokio::select! {
        _ = tokio::time::sleep(std::time::Duration::from_secs(seconds)) => {
            info!("Capture time elapsed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    for chunk in processor.stop() {
        let n = seq.fetch_add(1, Ordering::Relaxed);
        let _ = tx.send(chunk_event(n, &chunk));
    }
    let dropped = processor.dropped_samples();
    drop(processor);

    let _ = tx.send(SessionEvent::SessionEnd {
        session_id,
        timestamp: unix_timestamp(std::time::SystemTime::now()),
        decision: None,
        chunks: seq.load(Ordering::Relaxed),
    });
    drop(tx);

    writer.await.context("Event writer panicked")??;

    if dropped > 0 {
        info!("{} samples dropped under backpressure", dropped);
    }
    Ok(())
}

async fn run_plan(
    config: &SessionConfig,
    questions: u32,
    seed: Option<u64>,
    minutes_per_question: f64,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = spawn_writer(rx);

    let start = Utc::now();
    let mut session = match seed {
        Some(seed) => InterviewSession::seeded(config, Uuid::nil(), Uuid::nil(), start, seed),
        None => InterviewSession::new(config, Uuid::nil(), Uuid::nil(), start),
    }?;

    let at = |n: u32| {
        start + Duration::milliseconds((n as f64 * minutes_per_question * 60_000.0) as i64)
    };

    let _ = tx.send(SessionEvent::SessionStart {
        session_id: session.session_id(),
        timestamp: start.timestamp_millis() as f64 / 1000.0,
    });

    let mut asked = 0;
    while asked < questions {
        if session.end_decision(at(asked)).force_end {
            info!("Hard time limit reached after {} questions", asked);
            break;
        }
        let question = session.plan_next_question(at(asked))?;
        let _ = tx.send(SessionEvent::QuestionReady {
            index: question.index,
            question_id: question.question_id,
            domain: question.pick.domain,
            pick: question.pick,
            elapsed_minutes: question.elapsed_minutes,
        });
        asked += 1;
    }

    let end = at(asked);
    let decision = session.end_decision(end);
    info!("End decision: {}", decision.reason);

    let _ = tx.send(SessionEvent::SessionEnd {
        session_id: session.session_id(),
        timestamp: end.timestamp_millis() as f64 / 1000.0,
        decision: Some(decision),
        chunks: 0,
    });
    drop(tx);

    writer.await.context("Event writer panicked")??;
    Ok(())
}

#[derive(Serialize)]
struct RetakeReport {
    evaluated_at: DateTime<Utc>,
    eligibility: RetakeEligibility,
    result: Option<InterviewResult>,
}

fn run_retake(config: &SessionConfig, path: &Path, now: DateTime<Utc>) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read attempts file {}", path.display()))?;
    let raw: Vec<InterviewAttempt> =
        serde_json::from_str(&contents).context("Failed to parse attempts file")?;

    let engine = RetakePolicyEngine::new(config.retake.clone())?;

    let mut ledger = raw.first().map(|a| AttemptLedger::new(a.application_id));
    for a in raw {
        let attempt = InterviewAttempt::new(
            a.session_id,
            a.application_id,
            a.candidate_id,
            a.completed_at,
            a.score,
            a.duration_seconds,
            a.question_count,
            a.transcript_ref,
        )?;
        if let Some(ledger) = ledger.as_mut() {
            ledger.record(attempt, engine.policy())?;
        }
    }
    let attempts = ledger.as_ref().map(|l| l.attempts()).unwrap_or_default();

    let eligibility = engine.check_retake_eligibility(attempts, now);
    let result = engine.calculate_final_result(attempts).ok();
    info!("Retake eligibility: {}", eligibility.reason);

    let report = RetakeReport {
        evaluated_at: now,
        eligibility,
        result,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
