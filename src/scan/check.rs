use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::endpoint::Prober;
use super::{buckets, files};
use crate::error::Result;
use crate::snapshot::Issue;

/// Lazily produced issues. Each item is one probe's verdict; an `Err` means
/// the probe itself failed and the scan must stop.
pub type IssueIter<'a> = Box<dyn Iterator<Item = Result<Issue>> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    PubliclyListableBuckets,
    PubliclyReadableFiles,
    PubliclyUploadableBuckets,
    PubliclyDeletableBuckets,
}

impl CheckKind {
    /// Every check kind, in the order they run and are recorded.
    pub const ALL: [CheckKind; 4] = [
        CheckKind::PubliclyListableBuckets,
        CheckKind::PubliclyReadableFiles,
        CheckKind::PubliclyUploadableBuckets,
        CheckKind::PubliclyDeletableBuckets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::PubliclyListableBuckets => "PubliclyListableBuckets",
            CheckKind::PubliclyReadableFiles => "PubliclyReadableFiles",
            CheckKind::PubliclyUploadableBuckets => "PubliclyUploadableBuckets",
            CheckKind::PubliclyDeletableBuckets => "PubliclyDeletableBuckets",
        }
    }

    /// Builds the check for one account, keeping only the config it reads.
    pub fn build(self, config: &AccountConfig) -> Box<dyn Check> {
        match self {
            CheckKind::PubliclyListableBuckets => {
                Box::new(buckets::PubliclyListableBuckets::new(config))
            }
            CheckKind::PubliclyReadableFiles => Box::new(files::PubliclyReadableFiles::new(config)),
            CheckKind::PubliclyUploadableBuckets => {
                Box::new(buckets::PubliclyUploadableBuckets::new(config))
            }
            CheckKind::PubliclyDeletableBuckets => {
                Box::new(buckets::PubliclyDeletableBuckets::new(config))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    PubliclyListableBucket,
    PubliclyReadableFile,
    PubliclyUploadableBucket,
    PubliclyDeletableBucket,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::PubliclyListableBucket => "PubliclyListableBucketIssue",
            IssueKind::PubliclyReadableFile => "PubliclyReadableFileIssue",
            IssueKind::PubliclyUploadableBucket => "PubliclyUploadableBucketIssue",
            IssueKind::PubliclyDeletableBucket => "PubliclyDeletableBucketIssue",
        }
    }

    pub fn issue(self, resource: &str) -> Issue {
        Issue::new(self.as_str(), resource)
    }
}

/// Per-account configuration, shared by every check kind. Each check reads
/// the fields it needs; fields it does not know about are ignored, and a
/// missing field reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Every bucket in the account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket_list: Option<Vec<String>>,

    /// Bucket name -> a sample of object keys in that bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_random_files: Option<BTreeMap<String, Vec<String>>>,
}

impl AccountConfig {
    pub fn buckets(&self) -> &[String] {
        self.s3_bucket_list.as_deref().unwrap_or_default()
    }
}

/// A single kind of misconfiguration probe, bound to one account's config.
///
/// Checks hold no state beyond their config: every call to `find_issues`
/// starts over and probes again.
pub trait Check {
    fn kind(&self) -> CheckKind;
    fn find_issues<'a>(&'a self, prober: &'a Prober) -> IssueIter<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_ignores_fields_for_other_checks() {
        let config: AccountConfig = serde_json::from_str(
            r#"{"s3_bucket_list": ["a", "b"], "iam_users": ["root"], "keys_to_return": 3}"#,
        )
        .unwrap();
        assert_eq!(config.buckets(), ["a".to_string(), "b".to_string()]);
        assert!(config.s3_random_files.is_none());
    }

    #[test]
    fn empty_config_is_valid() {
        let config: AccountConfig = serde_json::from_str("{}").unwrap();
        assert!(config.buckets().is_empty());
    }

    #[test]
    fn every_kind_builds_from_any_config() {
        let config = AccountConfig::default();
        for kind in CheckKind::ALL {
            assert_eq!(kind.build(&config).kind(), kind);
        }
    }

    #[test]
    fn issue_kind_names_are_stable() {
        let issue = IssueKind::PubliclyReadableFile.issue("bucket");
        assert_eq!(issue.kind, "PubliclyReadableFileIssue");
        assert_eq!(issue.resource, "bucket");
    }
}
