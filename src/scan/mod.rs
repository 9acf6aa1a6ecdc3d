pub mod buckets;
pub mod check;
pub mod endpoint;
pub mod files;

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::platform::Environment;
use crate::snapshot::Snapshot;
use crate::store::{ObjectStore, SnapshotStore};
use check::{AccountConfig, Check, CheckKind};
use endpoint::Prober;

/// Top-level fields a caller cannot override through extra metadata.
const RESERVED_FIELDS: [&str; 4] = ["start_time", "end_time", "tests", "issues"];

/// Runs every check kind against every account config, one probe at a time,
/// and records the outcome as a snapshot.
pub struct Runner<S> {
    checks: Vec<Box<dyn Check>>,
    prober: Prober,
    environment: Box<dyn Environment>,
    store: SnapshotStore<S>,
}

impl<S: ObjectStore> Runner<S> {
    /// One check per (kind, account) pair, grouped by kind in `CheckKind::ALL`
    /// order.
    pub fn new(
        store: SnapshotStore<S>,
        prober: Prober,
        environment: impl Environment + 'static,
        configs: &[AccountConfig],
    ) -> Self {
        let checks = CheckKind::ALL
            .iter()
            .flat_map(|kind| configs.iter().map(move |config| kind.build(config)))
            .collect();

        Runner {
            checks,
            prober,
            environment: Box::new(environment),
            store,
        }
    }

    pub fn store(&self) -> &SnapshotStore<S> {
        &self.store
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Runs all checks and returns the snapshot without storing it.
    ///
    /// The first probe failure aborts the whole run.
    pub fn run(&self, extra: BTreeMap<String, Value>) -> Result<Snapshot> {
        if let Some(field) = extra.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
            return Err(Error::Config(format!("'{field}' cannot be used as snapshot metadata")));
        }

        let start_time = Utc::now();
        let mut issues = Vec::new();

        for check in &self.checks {
            let name = check.kind().as_str();
            info!("Running test: {name}");
            let started = Instant::now();
            let before = issues.len();

            for issue in check.find_issues(&self.prober) {
                let mut issue = issue?;
                issue.source_check = name.to_string();
                info!("Found {} with resource '{}'", issue.kind, issue.resource);
                issues.push(issue);
            }

            debug!(
                "{name} complete: {} issues, {:.2}s",
                issues.len() - before,
                started.elapsed().as_secs_f64()
            );
        }

        let end_time = Utc::now().max(start_time);

        let mut external_context = BTreeMap::new();
        external_context.insert(
            "external_ip".to_string(),
            Value::from(self.environment.external_ip()?),
        );
        external_context.extend(extra);

        Ok(Snapshot {
            start_time,
            end_time,
            checks_run: CheckKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            issues,
            external_context,
        })
    }

    /// Runs all checks, then stores the snapshot. Nothing is stored if the
    /// run fails.
    pub fn run_and_upload(&self, extra: BTreeMap<String, Value>) -> Result<Snapshot> {
        let snapshot = self.run(extra)?;
        self.store.put(&snapshot)?;
        Ok(snapshot)
    }
}
