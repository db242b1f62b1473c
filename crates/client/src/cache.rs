//! Reference data kept in the session store between runs.

use std::{fmt, future::Future, sync::Arc};

use {
    salesdesk_auth::KeyValueStore,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    client::ApiClient,
    error::{ApiError, Result},
    models::{BranchAccount, Invoice, RootAccount, SalesRep},
};

/// Prefix of every cache entry in the session store.
pub const CACHE_PREFIX: &str = "cache.";

/// Datasets fetched once after login and reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Analytics,
    SalesReps,
    BranchAccounts,
    RootAccounts,
    Invoices,
}

impl Dataset {
    pub const ALL: [Self; 5] = [
        Self::Analytics,
        Self::SalesReps,
        Self::BranchAccounts,
        Self::RootAccounts,
        Self::Invoices,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::SalesReps => "salesReps",
            Self::BranchAccounts => "branchAccounts",
            Self::RootAccounts => "rootAccounts",
            Self::Invoices => "invoices",
        }
    }

    /// Store key, e.g. `cache.salesReps`.
    pub fn key(self) -> String {
        format!("{CACHE_PREFIX}{}", self.name())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON snapshots of reference data, stored next to the credentials.
///
/// When disabled, reads always miss and writes are dropped.
#[derive(Clone)]
pub struct ReferenceCache {
    store: Arc<dyn KeyValueStore>,
    enabled: bool,
}

impl ReferenceCache {
    pub fn new(store: Arc<dyn KeyValueStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cached value for `dataset`. An entry that no longer decodes is treated as a miss.
    pub fn get<T: DeserializeOwned>(&self, dataset: Dataset) -> Result<Option<T>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(raw) = self.store.get(&dataset.key()).map_err(ApiError::Store)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(%dataset, error = %e, "discarding unreadable cache entry");
                Ok(None)
            },
        }
    }

    pub fn put<T: Serialize + ?Sized>(&self, dataset: Dataset, value: &T) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let raw = serde_json::to_string(value)?;
        self.store
            .set(&dataset.key(), &raw)
            .map_err(ApiError::Store)?;
        debug!(%dataset, bytes = raw.len(), "cached reference data");
        Ok(())
    }

    pub fn invalidate(&self, dataset: Dataset) -> Result<()> {
        self.store
            .remove(&dataset.key())
            .map_err(ApiError::Store)
    }

    /// Drop every cache entry, leaving credentials in place.
    pub fn clear(&self) -> Result<()> {
        for key in self.store.keys().map_err(ApiError::Store)? {
            if key.starts_with(CACHE_PREFIX) {
                self.store.remove(&key).map_err(ApiError::Store)?;
            }
        }
        Ok(())
    }

    /// Cached value if present, otherwise `fetch` and remember the result.
    pub async fn get_or_fetch<T, F, Fut>(&self, dataset: Dataset, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(dataset)? {
            debug!(%dataset, "cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        self.put(dataset, &value)?;
        Ok(value)
    }
}

/// Counts of what [`ApiClient::prefetch_reference_data`] loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchSummary {
    pub analytics: usize,
    pub sales_reps: usize,
    pub branch_accounts: usize,
    pub root_accounts: usize,
    pub invoices: usize,
}

fn len_of(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}

impl ApiClient {
    /// Load the reference datasets and store them in the cache.
    ///
    /// Analytics is fetched first; the remaining lists are fetched concurrently.
    pub async fn prefetch_reference_data(&self) -> Result<PrefetchSummary> {
        let analytics = self.sales_analysis().await?;
        self.cache().put(Dataset::Analytics, &analytics)?;

        let (reps, branches, roots, invoices) = tokio::try_join!(
            self.sales_reps().list(),
            self.branch_accounts().list(),
            self.root_accounts().list(),
            self.invoices().list(),
        )?;

        let cache = self.cache();
        cache.put(Dataset::SalesReps, &reps)?;
        cache.put(Dataset::BranchAccounts, &branches)?;
        cache.put(Dataset::RootAccounts, &roots)?;
        cache.put(Dataset::Invoices, &invoices)?;

        let summary = PrefetchSummary {
            analytics: len_of(&analytics),
            sales_reps: reps.len(),
            branch_accounts: branches.len(),
            root_accounts: roots.len(),
            invoices: invoices.len(),
        };
        info!(?summary, "reference data prefetched");
        Ok(summary)
    }

    pub async fn cached_analytics(&self) -> Result<Value> {
        self.cache()
            .get_or_fetch(Dataset::Analytics, || self.sales_analysis())
            .await
    }

    pub async fn cached_sales_reps(&self) -> Result<Vec<SalesRep>> {
        self.sales_reps().list_cached().await
    }

    pub async fn cached_branch_accounts(&self) -> Result<Vec<BranchAccount>> {
        self.branch_accounts().list_cached().await
    }

    pub async fn cached_root_accounts(&self) -> Result<Vec<RootAccount>> {
        self.root_accounts().list_cached().await
    }

    pub async fn cached_invoices(&self) -> Result<Vec<Invoice>> {
        self.invoices().list_cached().await
    }
}
