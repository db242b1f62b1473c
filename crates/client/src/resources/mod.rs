//! CRUD over the API's collections.
//!
//! Every collection shares one implementation, [`Resource`], parameterized by
//! its path and model type. Collection-specific calls live in the submodules.

mod accounts;
mod dashboard;
mod reports;

use std::{fmt, marker::PhantomData};

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::{debug, error},
};

pub use {
    accounts::HasSalesInvoice,
    dashboard::DashboardReport,
    reports::{SalesFilter, TopSellers},
};

use crate::{
    cache::Dataset,
    client::ApiClient,
    error::Result,
    models::{
        Account, BranchAccount, Category, Invoice, Product, RootAccount, SalesRep, SubCategory,
        Tag,
    },
};

/// One REST collection, e.g. `accounts/` with items at `accounts/{id}/`.
pub struct Resource<'a, T> {
    client: &'a ApiClient,
    path: &'static str,
    dataset: Option<Dataset>,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Resource<'_, T> {}

impl<T> fmt::Debug for Resource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("dataset", &self.dataset)
            .finish()
    }
}

impl<'a, T> Resource<'a, T>
where
    T: Serialize + DeserializeOwned,
{
    fn new(client: &'a ApiClient, path: &'static str, dataset: Option<Dataset>) -> Self {
        Self {
            client,
            path,
            dataset,
            _model: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    fn item_path(&self, id: i64) -> String {
        format!("{}{id}/", self.path)
    }

    /// Reference data built from this collection is stale after a write.
    fn invalidate(&self) -> Result<()> {
        if let Some(dataset) = self.dataset {
            debug!(%dataset, "invalidating cached reference data");
            self.client.cache().invalidate(dataset)?;
        }
        Ok(())
    }

    pub async fn list(self) -> Result<Vec<T>> {
        self.client
            .get_json(self.path)
            .await
            .inspect_err(|e| error!(resource = self.path, error = %e, "failed to list"))
    }

    /// Like [`Self::list`], but served from the reference cache when this
    /// collection backs a cached dataset.
    pub async fn list_cached(self) -> Result<Vec<T>> {
        match self.dataset {
            Some(dataset) => {
                self.client
                    .cache()
                    .get_or_fetch(dataset, || self.list())
                    .await
            },
            None => self.list().await,
        }
    }

    pub async fn get(self, id: i64) -> Result<T> {
        self.client
            .get_json(&self.item_path(id))
            .await
            .inspect_err(|e| error!(resource = self.path, id, error = %e, "failed to fetch"))
    }

    pub async fn create<B: Serialize + ?Sized>(self, body: &B) -> Result<T> {
        let created = self
            .client
            .post_json(self.path, body)
            .await
            .inspect_err(|e| error!(resource = self.path, error = %e, "failed to create"))?;
        self.invalidate()?;
        Ok(created)
    }

    /// Full replacement (`PUT`).
    pub async fn update<B: Serialize + ?Sized>(self, id: i64, body: &B) -> Result<T> {
        let updated = self
            .client
            .put_json(&self.item_path(id), body)
            .await
            .inspect_err(|e| error!(resource = self.path, id, error = %e, "failed to update"))?;
        self.invalidate()?;
        Ok(updated)
    }

    /// Partial update (`PATCH`).
    pub async fn patch<B: Serialize + ?Sized>(self, id: i64, body: &B) -> Result<T> {
        let updated = self
            .client
            .patch_json(&self.item_path(id), body)
            .await
            .inspect_err(|e| error!(resource = self.path, id, error = %e, "failed to patch"))?;
        self.invalidate()?;
        Ok(updated)
    }

    pub async fn delete(self, id: i64) -> Result<()> {
        self.client
            .delete(&self.item_path(id))
            .await
            .inspect_err(|e| error!(resource = self.path, id, error = %e, "failed to delete"))?;
        self.invalidate()
    }
}

impl ApiClient {
    pub fn accounts(&self) -> Resource<'_, Account> {
        Resource::new(self, "accounts/", None)
    }

    pub fn root_accounts(&self) -> Resource<'_, RootAccount> {
        Resource::new(self, "root-accounts/", Some(Dataset::RootAccounts))
    }

    pub fn branch_accounts(&self) -> Resource<'_, BranchAccount> {
        Resource::new(self, "branch-accounts/", Some(Dataset::BranchAccounts))
    }

    pub fn invoices(&self) -> Resource<'_, Invoice> {
        Resource::new(self, "invoices/", Some(Dataset::Invoices))
    }

    pub fn sales_reps(&self) -> Resource<'_, SalesRep> {
        Resource::new(self, "reps/", Some(Dataset::SalesReps))
    }

    pub fn products(&self) -> Resource<'_, Product> {
        Resource::new(self, "products/", None)
    }

    pub fn categories(&self) -> Resource<'_, Category> {
        Resource::new(self, "products/categories/", None)
    }

    pub fn subcategories(&self) -> Resource<'_, SubCategory> {
        Resource::new(self, "products/subcategories/", None)
    }

    pub fn tags(&self) -> Resource<'_, Tag> {
        Resource::new(self, "products/tags/", None)
    }
}
