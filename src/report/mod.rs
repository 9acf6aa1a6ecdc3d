pub mod json;
pub mod table;

use std::collections::BTreeSet;

use crate::error::Result;
use crate::snapshot::{IssueId, Snapshot};
use crate::store::diff::Delta;

/// What a scan reports: only the changes, or every current issue.
pub enum ScanOutcome {
    Diff(Delta),
    Full(BTreeSet<IssueId>),
}

pub fn print_scan(snapshot: &Snapshot, location: &str, outcome: &ScanOutcome, json_output: bool) {
    if json_output {
        let body = match outcome {
            ScanOutcome::Diff(delta) => json::render_delta(delta),
            ScanOutcome::Full(issues) => json::render_issue_set(issues),
        };
        println!("{body}");
        return;
    }

    print!("{}", table::render_snapshot(snapshot));
    println!();
    match outcome {
        ScanOutcome::Diff(delta) => print!("{}", table::render_delta(delta)),
        ScanOutcome::Full(issues) => print!("{}", table::render_issue_set(issues)),
    }
    print_scan_info(snapshot, location);
}

fn print_scan_info(snapshot: &Snapshot, location: &str) {
    let duration = snapshot.end_time - snapshot.start_time;
    let duration_sec = duration.num_milliseconds() as f64 / 1000.0;
    println!("\nscan completed in {duration_sec:.2}s");
    if let Some(ip) = snapshot.external_context.get("external_ip").and_then(|v| v.as_str()) {
        println!("probed from: {ip}");
    }
    println!("stored at: {location}");
}

pub fn print_snapshot(snapshot: &Snapshot, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", json::render_snapshot(snapshot)?);
    } else {
        print!("{}", table::render_snapshot(snapshot));
    }
    Ok(())
}

pub fn print_delta(delta: &Delta, json_output: bool) {
    if json_output {
        println!("{}", json::render_delta(delta));
    } else {
        print!("{}", table::render_delta(delta));
    }
}
