//! Number processing pipeline demonstrating filtering and transformations
//!
//! Pipeline:
//! 1. Source: numbers 1-100 added to the root stage
//! 2. Filter: keep only even numbers
//! 3. Transform: multiply by 10
//! 4. Sink: sum everything
//!
//! Usage: RUST_LOG=reactive_stage=debug cargo run --example number_chain --release

use crossbeam::channel;
use reactive_stage::{Stage, StageError};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), StageError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Number Processing Pipeline");
    println!("==========================");

    let start = Instant::now();

    let source = Stage::builder().name("source").spawn()?;
    let evens = source.filter(|n: &u64| n % 2 == 0)?;
    let scaled = evens.transform(|n| n * 10)?;

    let (tx, rx) = channel::unbounded();
    scaled.for_each(move |n| {
        let _ = tx.send(n);
    })?;

    for n in 1..=100 {
        source.add(n);
    }

    let sum: u64 = rx.iter().take(50).sum();
    source.stop();

    println!("Sum of even numbers x 10: {}", sum);
    println!("Expected: {}", (1..=100u64).filter(|n| n % 2 == 0).map(|n| n * 10).sum::<u64>());
    println!("Elapsed: {:.2?}", start.elapsed());
    println!("\n{}", source.metrics_summary());

    Ok(())
}
