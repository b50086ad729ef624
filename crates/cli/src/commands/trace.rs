use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use lamport_ledger::{CausalTrace, CausalTraceBuilder, TraceEvent};

use crate::output::read_logs;

/// Rebuild the causal trace from a run's event files and print it.
pub fn run(replica_events: &Path, customer_events: &Path, request: Option<&str>) -> anyhow::Result<CausalTrace> {
    let (replicas, customers) = read_logs(replica_events, customer_events)?;
    let trace = CausalTraceBuilder::new(&replicas, &customers).build()?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Request", "Source", "Clock", "Interface", "Comment"]);

    let events: Vec<TraceEvent> = match request {
        Some(id) => trace
            .request(id)
            .ok_or_else(|| anyhow::anyhow!("request {} not found in trace", id))?
            .events
            .clone(),
        None => trace.flatten(),
    };

    for event in &events {
        table.add_row(vec![
            event
                .entry
                .customer_request_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            event.source.to_string(),
            event.entry.logical_clock.to_string(),
            event.entry.interface.to_string(),
            event.entry.comment.clone(),
        ]);
    }

    println!("\nCausal Trace\n");
    println!("{table}\n");
    println!("Fingerprint: {}", trace.fingerprint_hex()?);

    Ok(trace)
}
