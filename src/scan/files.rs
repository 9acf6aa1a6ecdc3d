//! File-level check against a sample of object keys per bucket.

use std::collections::BTreeMap;

use super::check::{AccountConfig, Check, CheckKind, IssueIter, IssueKind};
use super::endpoint::Prober;
use crate::error::Result;
use crate::snapshot::Issue;

/// Raises an issue on any bucket with an anonymously readable object.
///
/// Keys are tried in order and the first readable one is reported; the rest
/// of that bucket's sample is skipped.
pub struct PubliclyReadableFiles {
    keys_by_bucket: BTreeMap<String, Vec<String>>,
}

impl PubliclyReadableFiles {
    pub fn new(config: &AccountConfig) -> Self {
        PubliclyReadableFiles {
            keys_by_bucket: config.s3_random_files.clone().unwrap_or_default(),
        }
    }
}

fn first_readable(prober: &Prober, bucket: &str, keys: &[String]) -> Option<Result<Issue>> {
    for key in keys {
        match prober.file_publicly_readable(bucket, key) {
            Ok(true) => return Some(describe(prober, bucket, key)),
            Ok(false) => continue,
            Err(e) => return Some(Err(e)),
        }
    }
    None
}

fn describe(prober: &Prober, bucket: &str, key: &str) -> Result<Issue> {
    let root = prober.bucket_root(bucket)?;
    Ok(IssueKind::PubliclyReadableFile
        .issue(bucket)
        .with_extra("key", key)
        .with_help(format!(
            "The files stored within this S3 bucket should not be public, \
             but {root}/{key} was readable."
        )))
}

impl Check for PubliclyReadableFiles {
    fn kind(&self) -> CheckKind {
        CheckKind::PubliclyReadableFiles
    }

    fn find_issues<'a>(&'a self, prober: &'a Prober) -> IssueIter<'a> {
        Box::new(
            self.keys_by_bucket
                .iter()
                .filter_map(move |(bucket, keys)| first_readable(prober, bucket, keys)),
        )
    }
}
