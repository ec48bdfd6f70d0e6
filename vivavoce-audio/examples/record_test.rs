//! Capture 5 seconds from the default microphone and report what came out

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vivavoce_audio::{AudioConfig, AudioProcessor, CpalCapture};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Capture Test ===\n");

    let config = AudioConfig::default();
    let mut backend = CpalCapture::new(&config);
    let mut processor = AudioProcessor::new(config)?;

    let chunks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&chunks);
    processor.set_chunk_callback(move |chunk| {
        counter.fetch_add(1, Ordering::Relaxed);
        println!("chunk: {} samples, {} base64 chars", chunk.len(), chunk.to_base64().len());
    });
    processor.set_level_callback(|sample| {
        let bar = "#".repeat((sample.level * 40.0) as usize);
        println!("level {:.3} {}", sample.level, bar);
    });
    processor.set_error_callback(|e| eprintln!("capture failed: {}", e));

    processor.start(&mut backend)?;
    thread::sleep(Duration::from_secs(5));
    let tail = processor.stop();

    println!("\n=== Result ===");
    println!("Chunks: {}", chunks.load(Ordering::Relaxed));
    println!("Tail chunks: {}", tail.len());
    println!("Dropped samples: {}", processor.dropped_samples());

    Ok(())
}
