//! Load Coordinator Module
//!
//! Runs loader calls for missing keys with at most one load in flight per key.
//!
//! A caller that misses claims the key by registering an in-flight record;
//! later callers for the same key subscribe to that record instead of loading
//! again. Loads run on spawned tasks, so a caller giving up never cancels a
//! load other callers are waiting on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheValue, SharedStore};
use crate::error::{CacheError, Result};
use crate::load::CacheLoader;

/// Result of one key's load. `Ok(None)` means a batch load omitted the key.
type LoadOutcome<V> = Result<Option<V>>;

// == Missing Key Policy ==
/// What a batch request does with keys the loader did not return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    /// Leave them out of the result
    #[default]
    Omit,
    /// Fail the request with `CacheError::PartialLoadFailure`
    Fail,
}

// == In-Flight Load ==
struct InFlightLoad<V> {
    sender: watch::Sender<Option<LoadOutcome<V>>>,
    /// Set when the key is written or invalidated while the load runs
    superseded: Arc<AtomicBool>,
}

impl<V> InFlightLoad<V> {
    fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            superseded: Arc::new(AtomicBool::new(false)),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<LoadOutcome<V>>> {
        self.sender.subscribe()
    }
}

/// A caller's stake in a key after claiming.
enum Claim<V> {
    /// The value turned up in the store while claiming
    Resident(V),
    /// A load is running; wait on it
    Pending(watch::Receiver<Option<LoadOutcome<V>>>),
}

/// A key this caller claimed and must now load.
struct NewClaim<K> {
    key: K,
    superseded: Arc<AtomicBool>,
}

// == Load Coordinator ==
pub struct LoadCoordinator<K, V> {
    store: SharedStore<K, V>,
    loader: Arc<dyn CacheLoader<K, V>>,
    in_flight: Mutex<HashMap<K, InFlightLoad<V>>>,
    missing_key_policy: MissingKeyPolicy,
}

impl<K: CacheKey, V: CacheValue> LoadCoordinator<K, V> {
    // == Constructor ==
    pub fn new(
        store: SharedStore<K, V>,
        loader: Arc<dyn CacheLoader<K, V>>,
        missing_key_policy: MissingKeyPolicy,
    ) -> Self {
        Self {
            store,
            loader,
            in_flight: Mutex::new(HashMap::new()),
            missing_key_policy,
        }
    }

    pub fn missing_key_policy(&self) -> MissingKeyPolicy {
        self.missing_key_policy
    }

    // == Load ==
    /// Returns the value for a key the caller found missing.
    ///
    /// Joins the in-flight load for the key if there is one, otherwise starts
    /// one with `CacheLoader::load`.
    pub async fn load(self: &Arc<Self>, key: K) -> Result<V> {
        let mut claims = self.claim(vec![key.clone()], true, false).await;
        match claims.pop() {
            Some((key, claim)) => self.resolve_one(&key, claim).await,
            None => Err(CacheError::load_aborted(&key)),
        }
    }

    // == Refresh ==
    /// Loads the key again even if a live value is stored.
    ///
    /// The stored value stays readable until the new one replaces it.
    pub async fn refresh(self: &Arc<Self>, key: K) -> Result<V> {
        let mut claims = self.claim(vec![key.clone()], false, false).await;
        match claims.pop() {
            Some((key, claim)) => self.resolve_one(&key, claim).await,
            None => Err(CacheError::load_aborted(&key)),
        }
    }

    // == Load All ==
    /// Returns values for keys the caller found missing.
    ///
    /// Keys already being loaded are waited on; the rest are claimed and
    /// fetched with one `load_all` call when the loader supports it, or with
    /// one `load` per key otherwise. Every load is awaited before an error
    /// is reported, so successful values are always stored.
    pub async fn load_all(self: &Arc<Self>, keys: Vec<K>) -> Result<HashMap<K, V>> {
        let claims = self.claim(keys, true, true).await;

        let mut loaded = HashMap::with_capacity(claims.len());
        let mut omitted = Vec::new();
        let mut failure = None;

        for (key, claim) in claims {
            let outcome = match claim {
                Claim::Resident(value) => Ok(Some(value)),
                Claim::Pending(receiver) => Self::wait(&key, receiver).await,
            };
            match outcome {
                Ok(Some(value)) => {
                    loaded.insert(key, value);
                }
                Ok(None) => omitted.push(key),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        if !omitted.is_empty() {
            match self.missing_key_policy {
                MissingKeyPolicy::Omit => {
                    debug!(keys = ?omitted, "batch load omitted keys, leaving them out");
                }
                MissingKeyPolicy::Fail => {
                    return Err(CacheError::partial_load_failure(omitted.iter()));
                }
            }
        }

        Ok(loaded)
    }

    // == Writes ==
    /// Stores `value` under `key`, superseding any load in flight for it.
    ///
    /// The in-flight map stays locked across the store write, so a load
    /// claimed for the key either sees this value on its re-check or is
    /// marked stale before it can complete. Waiters still receive the
    /// loaded value.
    pub async fn put(&self, key: K, value: V) {
        let in_flight = self.in_flight.lock().await;
        Self::mark_superseded(&in_flight, &key);
        self.store.write().await.put(key, value, Instant::now());
    }

    pub async fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let in_flight = self.in_flight.lock().await;
        let now = Instant::now();
        let mut store = self.store.write().await;
        for (key, value) in entries {
            Self::mark_superseded(&in_flight, &key);
            store.put(key, value, now);
        }
    }

    /// Removes `key`. A load in flight for it will not store its result.
    pub async fn invalidate(&self, key: &K) {
        let in_flight = self.in_flight.lock().await;
        Self::mark_superseded(&in_flight, key);
        self.store.write().await.invalidate(key);
    }

    pub async fn invalidate_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
    {
        let in_flight = self.in_flight.lock().await;
        let mut store = self.store.write().await;
        for key in keys {
            Self::mark_superseded(&in_flight, key);
            store.invalidate(key);
        }
    }

    /// Removes every entry and marks every in-flight load as stale.
    pub async fn invalidate_all(&self) {
        let in_flight = self.in_flight.lock().await;
        for load in in_flight.values() {
            load.superseded.store(true, Ordering::Release);
        }
        self.store.write().await.invalidate_all();
    }

    fn mark_superseded(in_flight: &HashMap<K, InFlightLoad<V>>, key: &K) {
        if let Some(load) = in_flight.get(key) {
            load.superseded.store(true, Ordering::Release);
            debug!(key = ?key, "in-flight load superseded by a write");
        }
    }

    /// Number of keys with a load in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    // == Claim ==
    /// Joins or starts loads for `keys`.
    ///
    /// With `recheck`, keys that became resident since the caller's miss are
    /// returned from the store instead. The store is read while the in-flight
    /// map is locked: a load completes by storing its value before releasing
    /// its claim, so a key is always seen either as stored or as in flight.
    async fn claim(
        self: &Arc<Self>,
        keys: Vec<K>,
        recheck: bool,
        batch: bool,
    ) -> Vec<(K, Claim<V>)> {
        let mut claims = Vec::with_capacity(keys.len());
        let mut new_claims = Vec::new();

        {
            let mut in_flight = self.in_flight.lock().await;

            let mut resident = HashMap::new();
            if recheck {
                let now = Instant::now();
                let mut store = self.store.write().await;
                for key in keys.iter().filter(|key| !in_flight.contains_key(*key)) {
                    if let Some(value) = store.peek(key, now) {
                        resident.insert(key.clone(), value);
                    }
                }
            }

            for key in keys {
                if let Some(load) = in_flight.get(&key) {
                    debug!(key = ?key, "joining in-flight load");
                    claims.push((key, Claim::Pending(load.subscribe())));
                } else if let Some(value) = resident.remove(&key) {
                    claims.push((key, Claim::Resident(value)));
                } else {
                    let load = InFlightLoad::new();
                    claims.push((key.clone(), Claim::Pending(load.subscribe())));
                    new_claims.push(NewClaim {
                        key: key.clone(),
                        superseded: Arc::clone(&load.superseded),
                    });
                    in_flight.insert(key, load);
                }
            }
        }

        if !new_claims.is_empty() {
            debug!(count = new_claims.len(), batch, "claimed keys for loading");
            if batch && self.loader.supports_load_all() {
                self.spawn_batch_load(new_claims);
            } else {
                for claim in new_claims {
                    self.spawn_load(claim);
                }
            }
        }

        claims
    }

    async fn resolve_one(&self, key: &K, claim: Claim<V>) -> Result<V> {
        let outcome = match claim {
            Claim::Resident(value) => return Ok(value),
            Claim::Pending(receiver) => Self::wait(key, receiver).await,
        };
        match outcome? {
            Some(value) => Ok(value),
            None => Err(CacheError::partial_load_failure([key])),
        }
    }

    async fn wait(key: &K, mut receiver: watch::Receiver<Option<LoadOutcome<V>>>) -> LoadOutcome<V> {
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(CacheError::load_aborted(key)))
    }

    // == Spawn Load ==
    /// Loads one key on a spawned task.
    ///
    /// The loader runs on its own task so a panic is reported to the waiters
    /// as `LoadAborted` instead of leaving the claim in place.
    fn spawn_load(self: &Arc<Self>, claim: NewClaim<K>) {
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            let loader = Arc::clone(&coordinator.loader);
            let key = claim.key.clone();
            let started = Instant::now();

            let outcome = match tokio::spawn(async move { loader.load(&key).await }).await {
                Ok(Ok(value)) => {
                    debug!(key = ?claim.key, elapsed = ?started.elapsed(), "loaded key");
                    Ok(Some(value))
                }
                Ok(Err(err)) => {
                    warn!(key = ?claim.key, error = %err, "loader failed");
                    Err(CacheError::load_failure(&claim.key, err))
                }
                Err(err) => {
                    warn!(key = ?claim.key, error = %err, "load task aborted");
                    Err(CacheError::load_aborted(&claim.key))
                }
            };

            coordinator.complete(vec![(claim, outcome)]).await;
        });
    }

    // == Spawn Batch Load ==
    /// Loads all claimed keys with a single `load_all` call on a spawned task.
    fn spawn_batch_load(self: &Arc<Self>, claims: Vec<NewClaim<K>>) {
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            let loader = Arc::clone(&coordinator.loader);
            let keys: Vec<K> = claims.iter().map(|claim| claim.key.clone()).collect();
            let started = Instant::now();

            let outcomes: Vec<(NewClaim<K>, LoadOutcome<V>)> = match tokio::spawn(async move {
                loader.load_all(&keys).await
            })
            .await
            {
                Ok(Ok(mut values)) => {
                    debug!(
                        requested = claims.len(),
                        returned = values.len(),
                        elapsed = ?started.elapsed(),
                        "batch load finished"
                    );
                    let requested: Vec<_> = claims
                        .into_iter()
                        .map(|claim| {
                            let value = values.remove(&claim.key);
                            (claim, Ok(value))
                        })
                        .collect();
                    if !values.is_empty() {
                        debug!(count = values.len(), "ignoring values for keys that were not requested");
                    }
                    requested
                }
                Ok(Err(err)) => {
                    warn!(keys = claims.len(), error = %err, "batch loader failed");
                    let cause = Arc::new(err);
                    claims
                        .into_iter()
                        .map(|claim| {
                            let err = CacheError::shared_load_failure(&claim.key, &cause);
                            (claim, Err(err))
                        })
                        .collect()
                }
                Err(err) => {
                    warn!(keys = claims.len(), error = %err, "batch load task aborted");
                    claims
                        .into_iter()
                        .map(|claim| {
                            let err = CacheError::load_aborted(&claim.key);
                            (claim, Err(err))
                        })
                        .collect()
                }
            };

            coordinator.complete(outcomes).await;
        });
    }

    // == Complete ==
    /// Stores successful values, releases the claims and wakes the waiters.
    async fn complete(&self, outcomes: Vec<(NewClaim<K>, LoadOutcome<V>)>) {
        {
            let now = Instant::now();
            let mut store = self.store.write().await;

            for (claim, outcome) in &outcomes {
                match outcome {
                    Ok(Some(value)) => {
                        store.record_load_success();
                        if claim.superseded.load(Ordering::Acquire) {
                            debug!(key = ?claim.key, "discarding load result superseded by a write");
                        } else {
                            store.put(claim.key.clone(), value.clone(), now);
                        }
                    }
                    Ok(None) | Err(_) => store.record_load_failure(),
                }
            }
        }

        let mut in_flight = self.in_flight.lock().await;
        for (claim, outcome) in outcomes {
            if let Some(load) = in_flight.remove(&claim.key) {
                load.sender.send_replace(Some(outcome));
            }
        }
    }
}
