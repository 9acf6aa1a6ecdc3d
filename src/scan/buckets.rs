//! Bucket-level checks.
//!
//! Each one probes every bucket in the account's `s3_bucket_list`, one
//! request at a time, and yields an issue for each bucket that answers
//! the way a public bucket would.

use super::check::{AccountConfig, Check, CheckKind, IssueIter, IssueKind};
use super::endpoint::Prober;
use crate::error::Result;
use crate::snapshot::Issue;

type Probe = fn(&Prober, &str) -> Result<bool>;
type Describe = fn(&Prober, &str) -> Result<Issue>;

fn bucket_issues<'a>(
    buckets: &'a [String],
    prober: &'a Prober,
    probe: Probe,
    describe: Describe,
) -> IssueIter<'a> {
    Box::new(buckets.iter().filter_map(move |bucket| {
        match probe(prober, bucket) {
            Ok(true) => Some(describe(prober, bucket)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Raises an issue on any bucket whose keys can be listed anonymously.
pub struct PubliclyListableBuckets {
    buckets: Vec<String>,
}

impl PubliclyListableBuckets {
    pub fn new(config: &AccountConfig) -> Self {
        PubliclyListableBuckets {
            buckets: config.buckets().to_vec(),
        }
    }
}

impl Check for PubliclyListableBuckets {
    fn kind(&self) -> CheckKind {
        CheckKind::PubliclyListableBuckets
    }

    fn find_issues<'a>(&'a self, prober: &'a Prober) -> IssueIter<'a> {
        bucket_issues(&self.buckets, prober, Prober::bucket_publicly_listable, |prober, bucket| {
            let root = prober.bucket_root(bucket)?;
            Ok(IssueKind::PubliclyListableBucket.issue(bucket).with_help(format!(
                "The list of keys stored within an S3 bucket should not be public, \
                 but {root} lists the keys publicly."
            )))
        })
    }
}

/// Raises an issue on any bucket that accepts anonymous uploads.
pub struct PubliclyUploadableBuckets {
    buckets: Vec<String>,
}

impl PubliclyUploadableBuckets {
    pub fn new(config: &AccountConfig) -> Self {
        PubliclyUploadableBuckets {
            buckets: config.buckets().to_vec(),
        }
    }
}

impl Check for PubliclyUploadableBuckets {
    fn kind(&self) -> CheckKind {
        CheckKind::PubliclyUploadableBuckets
    }

    fn find_issues<'a>(&'a self, prober: &'a Prober) -> IssueIter<'a> {
        bucket_issues(&self.buckets, prober, Prober::bucket_publicly_uploadable, |_, bucket| {
            Ok(IssueKind::PubliclyUploadableBucket.issue(bucket).with_help(format!(
                "An S3 bucket should not allow file uploads from the Internet, \
                 but {bucket} allows uploads."
            )))
        })
    }
}

/// Raises an issue on any bucket that accepts anonymous deletes.
pub struct PubliclyDeletableBuckets {
    buckets: Vec<String>,
}

impl PubliclyDeletableBuckets {
    pub fn new(config: &AccountConfig) -> Self {
        PubliclyDeletableBuckets {
            buckets: config.buckets().to_vec(),
        }
    }
}

impl Check for PubliclyDeletableBuckets {
    fn kind(&self) -> CheckKind {
        CheckKind::PubliclyDeletableBuckets
    }

    fn find_issues<'a>(&'a self, prober: &'a Prober) -> IssueIter<'a> {
        bucket_issues(&self.buckets, prober, Prober::bucket_publicly_deletable, |_, bucket| {
            Ok(IssueKind::PubliclyDeletableBucket.issue(bucket).with_help(format!(
                "An S3 bucket should not allow everyone to delete files, \
                 but {bucket} allows deletions."
            )))
        })
    }
}
