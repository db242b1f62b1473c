use std::collections::BTreeMap;

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::error,
};

use crate::{client::ApiClient, error::Result};

/// Query filters for the sales report. Blank values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesFilter(BTreeMap<String, String>);

impl SalesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Parse a `key=value` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Option<(String, String)> {
        let (key, value) = pair.split_once('=')?;
        let key = key.trim();
        (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SalesFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Body of `sales/top-products/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopSellers {
    #[serde(default)]
    pub top_products: Vec<Value>,
    #[serde(default)]
    pub top_accounts: Vec<Value>,
}

impl ApiClient {
    /// Line-level sales report.
    pub async fn sales_report(&self, filter: &SalesFilter) -> Result<Vec<Value>> {
        self.get_json_with_query("sales/report/", filter.iter())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch sales report"))
    }

    /// Per-product analysis; cached as the `analytics` dataset after login.
    pub async fn sales_analysis(&self) -> Result<Value> {
        self.get_json("sales/analysis/")
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch sales analysis"))
    }

    pub async fn monthly_sales_by_brand(&self) -> Result<Value> {
        self.get_json("sales/monthly_sales_by_brand/")
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch monthly sales by brand"))
    }

    pub async fn top_sellers(&self) -> Result<TopSellers> {
        self.get_json("sales/top-products/")
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch top sellers"))
    }

    pub async fn top_products(&self) -> Result<Vec<Value>> {
        Ok(self.top_sellers().await?.top_products)
    }

    pub async fn top_accounts(&self) -> Result<Vec<Value>> {
        Ok(self.top_sellers().await?.top_accounts)
    }
}
