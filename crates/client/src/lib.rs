//! Authenticated client for the salesdesk sales API.
//!
//! [`ApiClient`] attaches the stored bearer token to every call and, when the
//! server answers `401` with `token_not_valid`, refreshes the token once and
//! replays the call. Resource collections, dashboard and report endpoints,
//! and the reference-data cache are all built on top of it.

pub mod cache;
pub mod client;
pub mod error;
pub mod models;
pub mod request;
pub mod resources;
pub mod response;

pub use {
    cache::{Dataset, PrefetchSummary, ReferenceCache},
    client::ApiClient,
    error::{ApiError, Result},
    models::{
        Account, BranchAccount, Category, Invoice, Product, RootAccount, SalesRep, SubCategory,
        Tag, UserRegistration,
    },
    request::RequestDescriptor,
    resources::{DashboardReport, HasSalesInvoice, Resource, SalesFilter, TopSellers},
    response::ApiResponse,
};
