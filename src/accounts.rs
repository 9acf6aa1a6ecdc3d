//! Per-account scan configuration.
//!
//! The config store holds one `<account-id>.json` per account, written by a
//! job that can see the account's buckets, plus the reserved
//! `whitelist.json`. Scans read every account config back from there.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::scan::check::AccountConfig;
use crate::store::whitelist::WHITELIST_KEY;
use crate::store::ObjectStore;

/// `123456789012.json` -> `123456789012`
pub fn account_id(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

/// Every account config in the store, keyed by store key.
pub fn load_configs<S: ObjectStore + ?Sized>(store: &S) -> Result<BTreeMap<String, AccountConfig>> {
    let mut configs = BTreeMap::new();
    for key in store.list("")? {
        if key == WHITELIST_KEY {
            continue;
        }
        let bytes = store
            .get(&key)?
            .ok_or_else(|| Error::MissingObject(store.location(&key)))?;
        let config: AccountConfig =
            serde_json::from_slice(&bytes).map_err(|e| Error::json(format!("account config {key}"), e))?;
        debug!("Loaded config for account {}", account_id(&key));
        configs.insert(key, config);
    }
    Ok(configs)
}

/// Read access to one account's buckets, as needed to build its config.
pub trait BucketInventory {
    fn account_id(&self) -> Result<String>;

    fn list_buckets(&self) -> Result<Vec<String>>;

    /// Up to `max_keys` keys from the start of the bucket, in key order.
    fn keys_in_bucket(&self, bucket: &str, max_keys: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    /// Keys kept per bucket.
    pub keys_to_return: usize,
    /// Keys fetched per bucket to sample from.
    pub keys_to_request: usize,
}

impl Default for Sampling {
    fn default() -> Self {
        Sampling {
            keys_to_return: 10,
            keys_to_request: 100,
        }
    }
}

/// Builds an account config: the full bucket list, and for each non-empty
/// bucket a random sample of its first keys.
pub fn generate<I, R>(inventory: &I, sampling: Sampling, rng: &mut R) -> Result<AccountConfig>
where
    I: BucketInventory + ?Sized,
    R: Rng + ?Sized,
{
    let buckets = inventory.list_buckets()?;
    let mut random_files = BTreeMap::new();

    for bucket in &buckets {
        debug!("Getting {} keys from bucket '{}'", sampling.keys_to_request, bucket);
        let keys = inventory.keys_in_bucket(bucket, sampling.keys_to_request)?;
        if keys.is_empty() {
            continue;
        }
        let amount = sampling.keys_to_return.min(keys.len());
        let sample: Vec<String> = keys.choose_multiple(rng, amount).cloned().collect();
        random_files.insert(bucket.clone(), sample);
    }

    Ok(AccountConfig {
        s3_bucket_list: Some(buckets),
        s3_random_files: Some(random_files),
    })
}

/// Generates the config for the inventory's account and writes it to
/// `<account-id>.json`. Returns the key written.
pub fn generate_and_upload<S, I>(store: &S, inventory: &I, sampling: Sampling) -> Result<String>
where
    S: ObjectStore + ?Sized,
    I: BucketInventory + ?Sized,
{
    let config = generate(inventory, sampling, &mut rand::thread_rng())?;
    let key = format!("{}.json", inventory.account_id()?);
    let body = serde_json::to_vec(&config).map_err(|e| Error::json("account config", e))?;
    info!("Uploading to {}", store.location(&key));
    store.put(&key, &body)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FakeInventory {
        buckets: BTreeMap<String, Vec<String>>,
    }

    impl FakeInventory {
        fn new(buckets: &[(&str, usize)]) -> Self {
            FakeInventory {
                buckets: buckets
                    .iter()
                    .map(|(name, n)| {
                        (name.to_string(), (0..*n).map(|i| format!("obj-{i:03}")).collect())
                    })
                    .collect(),
            }
        }
    }

    impl BucketInventory for FakeInventory {
        fn account_id(&self) -> Result<String> {
            Ok("123456789012".to_string())
        }

        fn list_buckets(&self) -> Result<Vec<String>> {
            Ok(self.buckets.keys().cloned().collect())
        }

        fn keys_in_bucket(&self, bucket: &str, max_keys: usize) -> Result<Vec<String>> {
            Ok(self.buckets[bucket].iter().take(max_keys).cloned().collect())
        }
    }

    #[test]
    fn account_id_from_key() {
        assert_eq!(account_id("123.json"), "123");
        assert_eq!(account_id("123"), "123");
    }

    #[test]
    fn samples_from_first_keys_only() {
        let inventory = FakeInventory::new(&[("big", 500), ("small", 3), ("empty", 0)]);
        let mut rng = StdRng::seed_from_u64(7);
        let config = generate(&inventory, Sampling::default(), &mut rng).unwrap();

        assert_eq!(config.buckets().len(), 3);
        let files = config.s3_random_files.unwrap();
        assert!(!files.contains_key("empty"));
        assert_eq!(files["small"].len(), 3);
        assert_eq!(files["big"].len(), 10);
        assert!(files["big"].iter().all(|k| k.as_str() < "obj-100"));
    }

    #[test]
    fn loads_every_config_but_the_whitelist() {
        let store = MemoryStore::new();
        store.put("111.json", br#"{"s3_bucket_list": ["a"]}"#).unwrap();
        store.put("222.json", br#"{"s3_random_files": {"b": ["k"]}, "extra": 1}"#).unwrap();
        store.put(WHITELIST_KEY, br#"{"PubliclyListableBucketIssue": ["a"]}"#).unwrap();

        let configs = load_configs(&store).unwrap();
        assert_eq!(configs.keys().collect::<Vec<_>>(), vec!["111.json", "222.json"]);
        assert_eq!(configs["111.json"].buckets(), ["a".to_string()]);
    }

    #[test]
    fn generated_config_loads_back() {
        let store = MemoryStore::new();
        let inventory = FakeInventory::new(&[("logs", 4)]);
        let key = generate_and_upload(&store, &inventory, Sampling::default()).unwrap();
        assert_eq!(key, "123456789012.json");

        let configs = load_configs(&store).unwrap();
        assert_eq!(configs[&key].buckets(), ["logs".to_string()]);
        assert_eq!(configs[&key].s3_random_files.as_ref().unwrap()["logs"].len(), 4);
    }
}
