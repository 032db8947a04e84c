//! Word frequency counter pipeline
//!
//! Reads lines from stdin, splits them into cleaned words, counts frequencies,
//! and prints the top 10 words.
//!
//! Usage: cargo run --example word_count --release
//!        (Then type lines of text and press Ctrl-D to finish)

use crossbeam::channel;
use parking_lot::Mutex;
use reactive_stage::Stage;
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::Arc;

fn clean(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn top_n(counts: &HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut items: Vec<_> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.into_iter().take(n).collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Word Frequency Counter Pipeline");
    println!("================================");
    println!("Enter lines of text (Ctrl-D to finish):");
    println!();

    let lines = Stage::builder().name("lines").spawn()?;
    let words = lines.transform(|line: String| {
        line.split_whitespace()
            .map(clean)
            .filter(|w| w.len() > 2)
            .collect::<Vec<_>>()
    })?;

    let counts = Arc::new(Mutex::new(HashMap::new()));
    let (done_tx, done_rx) = channel::unbounded();
    let sink = Arc::clone(&counts);
    words.for_each(move |batch: Vec<String>| {
        let mut counts = sink.lock();
        for word in batch {
            *counts.entry(word).or_insert(0usize) += 1;
        }
        let _ = done_tx.send(());
    })?;

    let mut submitted = 0;
    for line in io::stdin().lock().lines() {
        lines.add(line?);
        submitted += 1;
    }

    // shutdown discards queued items, so wait until every line is counted
    for _ in 0..submitted {
        done_rx.recv()?;
    }
    lines.stop();

    println!("\n=== Top 10 Words ===");
    for (i, (word, count)) in top_n(&counts.lock(), 10).iter().enumerate() {
        println!("{:2}. {} ({})", i + 1, word, count);
    }
    println!("\n{}", lines.metrics_summary());

    Ok(())
}
