use std::{fmt, str::FromStr};

use {serde_json::Value, tracing::error};

use crate::{client::ApiClient, error::Result};

/// Dashboard widgets, each backed by one `dashboard/` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardReport {
    /// Gross sales per year plus year-to-date.
    GrossSales,
    TopBranchAccounts,
    TopSalesReps,
    TopBrands,
    MonthlySalesByRep,
}

impl DashboardReport {
    pub const ALL: [Self; 5] = [
        Self::GrossSales,
        Self::TopBranchAccounts,
        Self::TopSalesReps,
        Self::TopBrands,
        Self::MonthlySalesByRep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GrossSales => "gross-sales",
            Self::TopBranchAccounts => "top-ten-branch-ytd",
            Self::TopSalesReps => "top-ten-sales-rep-ytd",
            Self::TopBrands => "top-brands-ytd",
            Self::MonthlySalesByRep => "monthly-sales-by-sales-rep",
        }
    }

    pub fn path(self) -> String {
        format!("dashboard/{}/", self.as_str())
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardReport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|report| report.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|r| r.as_str()).collect();
                format!("unknown dashboard report '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

impl ApiClient {
    pub async fn dashboard(&self, report: DashboardReport) -> Result<Value> {
        self.get_json(&report.path())
            .await
            .inspect_err(|e| error!(%report, error = %e, "failed to fetch dashboard report"))
    }
}
