use {
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
    tracing::error,
};

use super::Resource;
use crate::{
    cache::Dataset,
    error::Result,
    models::{Account, BranchAccount, RootAccount},
};

/// Account kinds that expose `{id}/sales-invoice/`.
pub trait HasSalesInvoice {}

impl HasSalesInvoice for Account {}
impl HasSalesInvoice for RootAccount {}
impl HasSalesInvoice for BranchAccount {}

#[derive(Serialize)]
struct SalesRepAssignment {
    sales_rep: i64,
}

impl<T> Resource<'_, T>
where
    T: HasSalesInvoice + Serialize + DeserializeOwned,
{
    /// Account detail with its invoices and purchase cadence.
    pub async fn sales_invoice(self, id: i64) -> Result<Value> {
        self.client
            .get_json(&format!("{}{id}/sales-invoice/", self.path))
            .await
            .inspect_err(|e| {
                error!(resource = self.path, id, error = %e, "failed to fetch sales invoice")
            })
    }
}

impl Resource<'_, Account> {
    /// Reassign an account to another sales rep.
    pub async fn update_sales_rep(self, id: i64, sales_rep: i64) -> Result<Value> {
        let updated = self
            .client
            .put_json(
                &format!("{}{id}/sales-rep/", self.path),
                &SalesRepAssignment { sales_rep },
            )
            .await
            .inspect_err(|e| {
                error!(id, sales_rep, error = %e, "failed to update account sales rep")
            })?;
        // Rep rollups include their accounts.
        self.client.cache().invalidate(Dataset::SalesReps)?;
        Ok(updated)
    }
}
