//! Snapshot comparison engine.
//!
//! Compares the issue identities of two snapshots:
//! - identity is `(kind, resource)`; duplicates collapse
//! - whitelisted identities are removed from both sides first
//! - reports what appeared (new) and what disappeared (resolved)
//!
//! Without a previous snapshot there is no baseline, and nothing is
//! reported as changed.

use std::collections::BTreeSet;

use tracing::{error, info};

use super::whitelist::Whitelist;
use crate::snapshot::{IssueId, Snapshot};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub new_issues: BTreeSet<IssueId>,
    pub resolved_issues: BTreeSet<IssueId>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.new_issues.is_empty() && self.resolved_issues.is_empty()
    }
}

/// Every distinct issue identity in a snapshot.
pub fn issue_identity_set(snapshot: &Snapshot) -> BTreeSet<IssueId> {
    snapshot.issues.iter().map(|issue| issue.id()).collect()
}

/// Distinct issue identities with whitelisted ones removed. This is what
/// full (non-diff) reporting lists.
pub fn set_of_issues(snapshot: &Snapshot, whitelist: Option<&Whitelist>) -> BTreeSet<IssueId> {
    let mut issues = issue_identity_set(snapshot);
    if let Some(whitelist) = whitelist {
        issues.retain(|id| !whitelist.contains(id));
    }
    issues
}

pub fn diff(current: &Snapshot, previous: Option<&Snapshot>, whitelist: Option<&Whitelist>) -> Delta {
    let Some(previous) = previous else {
        return Delta::default();
    };

    let current_issues = set_of_issues(current, whitelist);
    let previous_issues = set_of_issues(previous, whitelist);

    let new_issues: BTreeSet<IssueId> = current_issues.difference(&previous_issues).cloned().collect();
    let resolved_issues: BTreeSet<IssueId> =
        previous_issues.difference(&current_issues).cloned().collect();

    if !new_issues.is_empty() {
        error!("{} new issues: {}", new_issues.len(), join(&new_issues));
    }
    if !resolved_issues.is_empty() {
        info!("{} issues resolved: {}", resolved_issues.len(), join(&resolved_issues));
    }

    Delta {
        new_issues,
        resolved_issues,
    }
}

fn join(ids: &BTreeSet<IssueId>) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Issue;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot(issues: &[(&str, &str)]) -> Snapshot {
        let now = Utc::now();
        Snapshot {
            start_time: now,
            end_time: now,
            checks_run: Vec::new(),
            issues: issues
                .iter()
                .map(|(kind, resource)| Issue::new(*kind, *resource))
                .collect(),
            external_context: BTreeMap::new(),
        }
    }

    fn ids(pairs: &[(&str, &str)]) -> BTreeSet<IssueId> {
        pairs.iter().map(|(k, r)| IssueId::new(*k, *r)).collect()
    }

    fn whitelist(pairs: &[(&str, &str)]) -> Whitelist {
        ids(pairs).into_iter().collect()
    }

    #[test]
    fn duplicates_collapse() {
        let s = snapshot(&[("A", "x"), ("A", "x"), ("B", "x")]);
        let mut with_key = s.clone();
        with_key.issues.push(Issue::new("A", "x").with_extra("key", "other/file"));
        assert_eq!(issue_identity_set(&with_key), ids(&[("A", "x"), ("B", "x")]));
    }

    #[test]
    fn same_snapshot_has_no_delta() {
        let s = snapshot(&[("A", "x"), ("B", "y")]);
        assert!(diff(&s, Some(&s), None).is_empty());
        assert!(diff(&s, Some(&s), Some(&Whitelist::default())).is_empty());
        assert!(diff(&s, Some(&s), Some(&whitelist(&[("A", "x")]))).is_empty());
    }

    #[test]
    fn new_and_resolved() {
        let current = snapshot(&[("A", "x")]);
        let previous = snapshot(&[("B", "y")]);
        let delta = diff(&current, Some(&previous), None);
        assert_eq!(delta.new_issues, ids(&[("A", "x")]));
        assert_eq!(delta.resolved_issues, ids(&[("B", "y")]));
    }

    #[test]
    fn whitelisted_issue_is_neither_new_nor_resolved() {
        let current = snapshot(&[("A", "x")]);
        let previous = snapshot(&[("B", "y")]);
        let delta = diff(&current, Some(&previous), Some(&whitelist(&[("A", "x")])));
        assert!(delta.new_issues.is_empty());
        assert_eq!(delta.resolved_issues, ids(&[("B", "y")]));

        let delta = diff(&previous, Some(&current), Some(&whitelist(&[("A", "x")])));
        assert_eq!(delta.new_issues, ids(&[("B", "y")]));
        assert!(delta.resolved_issues.is_empty());
    }

    #[test]
    fn no_baseline_reports_nothing() {
        let current = snapshot(&[("A", "x"), ("B", "y")]);
        assert!(diff(&current, None, None).is_empty());
        assert!(diff(&current, None, Some(&whitelist(&[("C", "z")]))).is_empty());
    }

    #[test]
    fn unchanged_issue_not_reported() {
        let previous = snapshot(&[
            ("PubliclyDeletableBucketIssue", "deletable"),
            ("PubliclyDeletableBucketIssue", "another-deletable"),
        ]);
        let current = snapshot(&[
            ("PubliclyDeletableBucketIssue", "deletable"),
            ("PubliclyListableBucketIssue", "listable"),
        ]);
        let delta = diff(&current, Some(&previous), None);
        assert_eq!(delta.new_issues, ids(&[("PubliclyListableBucketIssue", "listable")]));
        assert_eq!(
            delta.resolved_issues,
            ids(&[("PubliclyDeletableBucketIssue", "another-deletable")])
        );
    }

    #[test]
    fn full_listing_applies_whitelist() {
        let s = snapshot(&[
            ("PubliclyReadableFileIssue", "my-bucket"),
            ("PubliclyListableBucketIssue", "my-other-bucket"),
        ]);
        assert_eq!(set_of_issues(&s, None).len(), 2);
        assert_eq!(
            set_of_issues(&s, Some(&whitelist(&[("PubliclyReadableFileIssue", "my-bucket")]))),
            ids(&[("PubliclyListableBucketIssue", "my-other-bucket")])
        );
        assert!(set_of_issues(&snapshot(&[]), None).is_empty());
    }
}
