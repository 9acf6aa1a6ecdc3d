//! JSON output for scripting and piping.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::snapshot::{IssueId, Snapshot};
use crate::store::diff::Delta;

fn ids(issues: &BTreeSet<IssueId>) -> Value {
    issues
        .iter()
        .map(|id| json!({ "issue": id.kind, "resource": id.resource }))
        .collect()
}

/// The snapshot exactly as stored.
pub fn render_snapshot(snapshot: &Snapshot) -> Result<String> {
    let bytes = snapshot.to_json()?;
    String::from_utf8(bytes).map_err(|e| Error::Config(format!("snapshot is not UTF-8: {e}")))
}

pub fn render_delta(delta: &Delta) -> String {
    json!({
        "new": ids(&delta.new_issues),
        "resolved": ids(&delta.resolved_issues),
    })
    .to_string()
}

pub fn render_issue_set(issues: &BTreeSet<IssueId>) -> String {
    json!({ "issues": ids(issues) }).to_string()
}
