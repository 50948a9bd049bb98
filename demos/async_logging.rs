//! Async logging example
//!
//! Demonstrates queued dispatch and request context that follows tasks
//! across `.await` points and threads.
//!
//! Run with: cargo run --example async_logging

use context_logger_system::prelude::*;
use std::thread;
use std::time::Duration;

struct Job(u32);

impl WorkUnit for Job {
    fn acting_user_id(&self) -> Option<String> {
        Some(format!("worker-{}", self.0 % 2))
    }

    fn event_id(&self) -> Option<String> {
        Some(format!("job-{}", self.0))
    }
}

async fn run_job(logger: Logger<Npm>, steps: u32) {
    for step in 0..steps {
        logger.verbose(("step", step));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let child = logger.clone();
    spawn_in_context(async move { child.info("cleanup scheduled") })
        .await
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Context Logger System - Async Logging Example ===\n");

    let logger = Logger::<Npm>::builder()
        .sink(
            SinkConfig::new("console", "silly").with_colorize(true),
            StreamSink::stdout(),
        )
        .sink(
            SinkConfig::new("file", "info").with_timestamp(true),
            FileSink::new("async_test.log")?,
        )
        .async_mode(1000)
        .build();

    println!("1. Interleaved tasks keep their own context:");
    let handles: Vec<_> = (1..=3)
        .map(|id| {
            let logger = logger.clone();
            tokio::spawn(async move {
                let job = Job(id);
                logger
                    .setup_context_async(&job, run_job(logger.clone(), 3))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.ok();
    }

    println!("\n2. Multi-threaded logging:");
    let threads: Vec<_> = (0..4)
        .map(|thread_id| {
            let logger = logger.clone();
            thread::spawn(move || {
                logger.setup_context(&Job(100 + thread_id), || {
                    for i in 0..5 {
                        logger.debug(("thread", thread_id, "message", i));
                    }
                });
            })
        })
        .collect();

    for handle in threads {
        handle.join().ok();
    }

    let drained = logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    let metrics = logger.metrics();
    println!(
        "\n   drained: {}, lines written: {}, dropped: {}",
        drained,
        metrics.lines_written(),
        metrics.dropped_count()
    );

    println!("\n=== Example completed successfully! ===");
    println!("Check 'async_test.log' for file output");

    Ok(())
}
