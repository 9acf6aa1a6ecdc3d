//! Chat notifications through an incoming webhook.
//!
//! Messages use the attachment format:
//! - one attachment per group (new issues, fixed issues, or all issues)
//! - each line reads `<resource>: <issue kind>`
//! - the title links to the stored snapshot
//!
//! Nothing is sent when there is nothing to say, or when no hook is set.

use std::collections::BTreeSet;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::snapshot::IssueId;
use crate::store::diff::Delta;

pub struct IssueGroup<'a> {
    pub color: &'static str,
    pub title: String,
    pub issues: &'a BTreeSet<IssueId>,
}

pub fn build_message(groups: &[IssueGroup<'_>], link: &str) -> Value {
    let attachments: Vec<Value> = groups
        .iter()
        .map(|group| {
            let text = group
                .issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            json!({
                "color": group.color,
                "title": group.title,
                "title_link": link,
                "text": text,
            })
        })
        .collect();
    json!({ "attachments": attachments })
}

pub fn diff_groups(delta: &Delta) -> Vec<IssueGroup<'_>> {
    let mut groups = Vec::new();
    if !delta.new_issues.is_empty() {
        groups.push(IssueGroup {
            color: "danger",
            title: format!("{} new bucket security issues", delta.new_issues.len()),
            issues: &delta.new_issues,
        });
    }
    if !delta.resolved_issues.is_empty() {
        groups.push(IssueGroup {
            color: "good",
            title: format!("{} bucket security issues fixed", delta.resolved_issues.len()),
            issues: &delta.resolved_issues,
        });
    }
    groups
}

pub fn full_groups(issues: &BTreeSet<IssueId>) -> Vec<IssueGroup<'_>> {
    if issues.is_empty() {
        return Vec::new();
    }
    vec![IssueGroup {
        color: "danger",
        title: format!("{} bucket security issues", issues.len()),
        issues,
    }]
}

pub struct Notifier {
    hook_url: Option<String>,
}

impl Notifier {
    pub fn new(hook_url: Option<String>) -> Self {
        Notifier {
            hook_url: hook_url.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.hook_url.is_some()
    }

    /// New and fixed issues since the previous snapshot.
    pub fn send_diff(&self, delta: &Delta, link: &str) -> Result<()> {
        self.send_groups(&diff_groups(delta), link)
    }

    /// Every current issue.
    pub fn send_full(&self, issues: &BTreeSet<IssueId>, link: &str) -> Result<()> {
        self.send_groups(&full_groups(issues), link)
    }

    fn send_groups(&self, groups: &[IssueGroup<'_>], link: &str) -> Result<()> {
        if groups.is_empty() {
            return Ok(());
        }
        let Some(hook) = &self.hook_url else {
            debug!("No webhook configured, skipping notification");
            return Ok(());
        };

        let message = build_message(groups, link);
        ureq::post(hook)
            .send_json(message)
            .map_err(|e| Error::http(hook, e))?;
        info!("Sent notification with {} group(s)", groups.len());
        Ok(())
    }
}
