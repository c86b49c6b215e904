//! Cache Demo - walks through the cache's population strategies
//!
//! Runs three scenarios against explicitly constructed caches:
//! 1. Manual cache: `get_if_present`, `put`, `invalidate`, `get_with`
//! 2. Loading cache: single-key `get` and batch `get_all` through a loader
//! 3. Cache-aside with a batch loader: only missing keys reach the source

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loading_cache::models::DataObject;
use loading_cache::{loader_fn, Cache, CacheBuilder, CacheConfig, CacheLoader, LoadingCache};

const DEMO_LINE: &str = "============================================================";

/// Main entry point for the cache demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache configuration from environment variables
/// 3. Run each demo scenario, stopping at the first failed check
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loading_cache=info,cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env_config = CacheConfig::from_env()?;
    let config = CacheConfig {
        maximum_size: env_config.maximum_size.or(Some(100)),
        expire_after_write: env_config.expire_after_write.or(Some(Duration::from_secs(60))),
        ..env_config
    };
    info!(
        "Configuration loaded: maximum_size={:?}, expire_after_write={:?}, cleanup_interval={:?}",
        config.maximum_size, config.expire_after_write, config.cleanup_interval
    );

    demo_manual_cache(&config).await?;
    info!("End of manual cache demo");

    demo_loading_cache(&config).await?;
    info!("End of loading cache demo");

    demo_cache_aside_with_many_keys().await?;
    info!("End of cache-aside demo");

    Ok(())
}

async fn demo_manual_cache(config: &CacheConfig) -> anyhow::Result<()> {
    log_header("Manual Cache Strategy Demo");

    let cache: Cache<String, DataObject> = CacheBuilder::from_config(config).build()?;
    let cleanup = config
        .cleanup_interval
        .map(|interval| cache.spawn_cleanup(interval))
        .transpose()?;

    let key = "A".to_string();

    log_step("Initial empty cache check");
    let value = cache.get_if_present(&key).await;
    check("Cache should be empty initially", value.is_none())?;

    log_step("Add data to cache manually");
    let fake_data = DataObject::new("Fake Data");
    cache.put(key.clone(), fake_data.clone()).await;

    let value = cache.get_if_present(&key).await;
    check(
        "Cache should contain manually added data",
        value.as_ref() == Some(&fake_data),
    )?;

    log_step("Invalidate cache entry");
    cache.invalidate(&key).await;
    let value = cache.get_if_present(&key).await;
    check("Cache should be empty after invalidation", value.is_none())?;

    log_step("Use get_with() with a fallback function");
    let expected = DataObject::new(format!("Data for {}", key));
    // Computed on a miss and stored for later reads
    let value = cache
        .get_with(key.clone(), |k| DataObject::new(format!("Data for {}", k)))
        .await;
    check("Cache should return computed value", value == expected)?;
    check(
        "Computed value should be in cache now",
        cache.get_if_present(&key).await.is_some(),
    )?;

    log_stats(cache.stats().await)?;
    if let Some(handle) = cleanup {
        handle.abort();
    }
    Ok(())
}

async fn demo_loading_cache(config: &CacheConfig) -> anyhow::Result<()> {
    log_header("Loading Cache Strategy Demo");

    let cache: LoadingCache<String, DataObject> = CacheBuilder::from_config(config)
        .build_with_loader(loader_fn(|key: String| async move {
            anyhow::Ok(DataObject::new(format!("Data for {}", key)))
        }))?;

    let keys: Vec<String> = ["A", "B", "C"].iter().map(|k| k.to_string()).collect();

    log_step("Get single value with automatic loading");
    let value = cache.get(&keys[0]).await?;
    check(
        "Should load data for single key",
        value == DataObject::new(format!("Data for {}", keys[0])),
    )?;

    log_step("Batch loading with get_all()");
    let loaded = cache.get_all(keys.clone()).await?;
    check("Should load data for all keys", loaded.len() == keys.len())?;

    log_step("Verify cached data");
    for key in &keys {
        let cached = cache.get_if_present(key).await;
        check(
            "Data should be in cache after loading",
            cached == Some(DataObject::new(format!("Data for {}", key))),
        )?;
    }

    log_stats(cache.stats().await)?;
    Ok(())
}

async fn demo_cache_aside_with_many_keys() -> anyhow::Result<()> {
    log_header("Cache-Aside With Many Keys Demo");

    let db = FakeDatabase::default();
    let cache: LoadingCache<String, String> = CacheBuilder::new().build_with_loader(db.clone())?;

    cache.put("UUID_2".to_string(), "DB_2".to_string()).await;
    let keys: HashSet<String> = ["UUID_1", "UUID_2", "UUID_3"]
        .iter()
        .map(|k| k.to_string())
        .collect();

    log_step("get_all first time");
    let results = cache.get_all(keys.clone()).await?;
    info!("Result: {:?}", sorted(&results));
    check("Should return every requested key", results.len() == keys.len())?;
    check(
        "Only the missing keys should be fetched, in one batch",
        db.batch_fetches() == 1 && db.single_fetches() == 0,
    )?;

    log_step("get_all second time");
    let results = cache.get_all(keys.clone()).await?;
    info!("Result: {:?}", sorted(&results));
    check(
        "Second call should be served entirely from the cache",
        db.batch_fetches() == 1 && db.single_fetches() == 0,
    )?;

    log_stats(cache.stats().await)?;
    Ok(())
}

// == Backing Source ==
/// Stand-in for a database, answering "DB_<id>" for every id.
#[derive(Clone, Default)]
struct FakeDatabase {
    single_fetches: Arc<AtomicUsize>,
    batch_fetches: Arc<AtomicUsize>,
}

impl FakeDatabase {
    fn single_fetches(&self) -> usize {
        self.single_fetches.load(Ordering::SeqCst)
    }

    fn batch_fetches(&self) -> usize {
        self.batch_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheLoader<String, String> for FakeDatabase {
    async fn load(&self, id: &String) -> anyhow::Result<String> {
        info!("Fetching single ID from DB: {}", id);
        self.single_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(format!("DB_{}", id))
    }

    fn supports_load_all(&self) -> bool {
        true
    }

    async fn load_all(&self, ids: &[String]) -> anyhow::Result<HashMap<String, String>> {
        info!("Fetching batch IDs from DB: {:?}", ids);
        self.batch_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(ids.iter().map(|id| (id.clone(), format!("DB_{}", id))).collect())
    }
}

// == Presentation Helpers ==
fn log_header(title: &str) {
    info!("{}", DEMO_LINE);
    info!(">>> {}", title);
    info!("{}", DEMO_LINE);
}

fn log_step(message: &str) {
    info!("[Step] {}", message);
}

/// Logs the check and aborts the current demo on failure.
fn check(message: &str, condition: bool) -> anyhow::Result<()> {
    info!(
        "[Assert] {} - {}",
        if condition { "PASS" } else { "FAIL" },
        message
    );
    anyhow::ensure!(condition, "check failed: {}", message);
    Ok(())
}

fn log_stats(stats: loading_cache::CacheStats) -> anyhow::Result<()> {
    info!("Cache stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

fn sorted<V: Clone + Ord>(results: &HashMap<String, V>) -> Vec<(String, V)> {
    let mut entries: Vec<_> = results
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort();
    entries
}
