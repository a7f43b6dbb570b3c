//! Pipeline statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DispatchStatsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Readings pulled from the source
    pub readings_received: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Name of the reading source
    pub source: String,

    /// Number of registered tags
    pub active_tags: usize,

    /// Enabled sinks, in dispatch order
    pub sinks: Vec<String>,

    /// Per-reading dispatch outcomes
    pub dispatch: DispatchStatsAggregator,

    /// Final counters of each queued sink
    pub queues: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    /// Readings per second over the whole run
    pub fn readings_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.readings_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Tag Logger Run ===\n");

        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Source: {}", self.source);
        println!("   Readings received: {}", self.readings_received);
        println!("   Readings/s: {:.2}", self.readings_per_sec());
        println!("   Registered tags: {}", self.active_tags);
        if self.sinks.is_empty() {
            println!("   Sinks: none");
        } else {
            println!("   Sinks: {}", self.sinks.join(", "));
        }

        println!();
        print!("{}", self.dispatch.summary());

        if !self.queues.is_empty() {
            println!("\nQueued sinks");
            for (name, snapshot) in &self.queues {
                println!(
                    "   {}: written={} failed={} dropped={}",
                    name, snapshot.write_count, snapshot.failure_count, snapshot.dropped_count
                );
            }
        }
        println!();
    }
}
