//! Plain-text rendering for snapshots and deltas.
//!
//! - Groups issues by kind, kinds sorted by issue count (largest first)
//! - Lists resources alphabetically within a kind
//! - Per-kind subtotals and a grand total

use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::{IssueId, Snapshot};
use crate::store::diff::Delta;

const RESOURCE_WIDTH: usize = 48;

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "snapshot {} ({} checks, {} issues)\n",
        snapshot.key(),
        snapshot.checks_run.len(),
        snapshot.issues.len()
    ));

    if snapshot.issues.is_empty() {
        output.push_str("\nNo public buckets detected.\n");
        return output;
    }

    let mut by_kind: BTreeMap<&str, Vec<(&str, Option<&str>)>> = BTreeMap::new();
    for issue in &snapshot.issues {
        let key = issue.extra.get("key").and_then(|v| v.as_str());
        by_kind
            .entry(issue.kind.as_str())
            .or_default()
            .push((issue.resource.as_str(), key));
    }

    let mut kinds: Vec<_> = by_kind.keys().copied().collect();
    kinds.sort_by_key(|kind| std::cmp::Reverse(by_kind[kind].len()));

    for kind in kinds {
        let mut entries = by_kind[kind].clone();
        entries.sort();

        output.push_str(&format!("\n{kind}\n"));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for (resource, key) in &entries {
            match key {
                Some(key) => output.push_str(&format!(
                    "  {}  ({key})\n",
                    truncate(resource, RESOURCE_WIDTH)
                )),
                None => output.push_str(&format!("  {}\n", truncate(resource, RESOURCE_WIDTH))),
            }
        }
        output.push_str(&format!("  subtotal: {}\n", entries.len()));
    }

    output.push_str(&format!("\nTOTAL: {}\n", snapshot.issues.len()));
    output
}

/// Issues remaining after whitelist suppression, as reported in full mode.
pub fn render_issue_set(issues: &BTreeSet<IssueId>) -> String {
    if issues.is_empty() {
        return String::from("No issues to report.\n");
    }
    let mut output = format!("{} bucket security issues:\n", issues.len());
    for id in issues {
        output.push_str(&format!("  [!] {id}\n"));
    }
    output
}

pub fn render_delta(delta: &Delta) -> String {
    if delta.is_empty() {
        return String::from("No changes detected.\n");
    }

    let mut output = String::new();
    for id in &delta.new_issues {
        output.push_str(&format!("  [new] {id}\n"));
    }
    for id in &delta.resolved_issues {
        output.push_str(&format!("  [fixed] {id}\n"));
    }
    output.push_str(&format!(
        "\n{} new, {} fixed\n",
        delta.new_issues.len(),
        delta.resolved_issues.len()
    ));
    output
}

pub fn render_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        return String::from("No snapshots found. Run 'bucket-inspector scan' to create one.\n");
    }
    let mut output = String::from("Snapshots:\n");
    for key in keys {
        output.push_str(&format!("  {key}\n"));
    }
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
