use {
    anyhow::Result,
    clap::Subcommand,
    salesdesk_client::{HasSalesInvoice, Resource},
    serde::{Serialize, de::DeserializeOwned},
};

use crate::{Context, parse_data, print_json};

#[derive(Subcommand)]
pub enum CrudAction {
    /// List all records.
    List {
        /// Serve from the local reference cache when it holds this list.
        #[arg(long)]
        cached: bool,
    },
    /// Show one record.
    Get { id: i64 },
    /// Create a record from a JSON body.
    Create {
        #[arg(long)]
        data: String,
    },
    /// Replace a record with a JSON body.
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AccountAction {
    List,
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
    /// Assign the account to another sales rep.
    SalesRep {
        id: i64,
        /// Sales rep id.
        #[arg(long)]
        rep: i64,
    },
    /// Account detail with invoices and purchase cadence.
    SalesInvoice {
        id: i64,
    },
}

/// Root and branch accounts share the same operations.
#[derive(Subcommand)]
pub enum AccountTreeAction {
    List {
        #[arg(long)]
        cached: bool,
    },
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
    SalesInvoice {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ProductAction {
    List,
    /// Update some fields of a product.
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Categories {
        #[command(subcommand)]
        action: TaxonomyAction,
    },
    Subcategories {
        #[command(subcommand)]
        action: TaxonomyAction,
    },
    Tags {
        #[command(subcommand)]
        action: TaxonomyAction,
    },
}

#[derive(Subcommand)]
pub enum TaxonomyAction {
    List,
    Create {
        #[arg(long)]
        data: String,
    },
}

pub async fn handle_crud<T>(resource: Resource<'_, T>, action: CrudAction) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    match action {
        CrudAction::List { cached: true } => print_json(&resource.list_cached().await?),
        CrudAction::List { cached: false } => print_json(&resource.list().await?),
        CrudAction::Get { id } => print_json(&resource.get(id).await?),
        CrudAction::Create { data } => print_json(&resource.create(&parse_data(&data)?).await?),
        CrudAction::Update { id, data } => {
            print_json(&resource.update(id, &parse_data(&data)?).await?)
        },
        CrudAction::Delete { id } => {
            resource.delete(id).await?;
            println!("Deleted {}{id}", resource.path());
            Ok(())
        },
    }
}

pub async fn handle_accounts(ctx: &Context, action: AccountAction) -> Result<()> {
    let accounts = ctx.client.accounts();
    match action {
        AccountAction::List => handle_crud(accounts, CrudAction::List { cached: false }).await,
        AccountAction::Get { id } => handle_crud(accounts, CrudAction::Get { id }).await,
        AccountAction::Create { data } => handle_crud(accounts, CrudAction::Create { data }).await,
        AccountAction::Update { id, data } => {
            handle_crud(accounts, CrudAction::Update { id, data }).await
        },
        AccountAction::Delete { id } => handle_crud(accounts, CrudAction::Delete { id }).await,
        AccountAction::SalesRep { id, rep } => {
            print_json(&accounts.update_sales_rep(id, rep).await?)
        },
        AccountAction::SalesInvoice { id } => print_json(&accounts.sales_invoice(id).await?),
    }
}

pub async fn handle_account_tree<T>(resource: Resource<'_, T>, action: AccountTreeAction) -> Result<()>
where
    T: HasSalesInvoice + Serialize + DeserializeOwned,
{
    match action {
        AccountTreeAction::List { cached } => {
            handle_crud(resource, CrudAction::List { cached }).await
        },
        AccountTreeAction::Get { id } => handle_crud(resource, CrudAction::Get { id }).await,
        AccountTreeAction::Create { data } => {
            handle_crud(resource, CrudAction::Create { data }).await
        },
        AccountTreeAction::Delete { id } => handle_crud(resource, CrudAction::Delete { id }).await,
        AccountTreeAction::SalesInvoice { id } => print_json(&resource.sales_invoice(id).await?),
    }
}

pub async fn handle_products(ctx: &Context, action: ProductAction) -> Result<()> {
    let client = &ctx.client;
    match action {
        ProductAction::List => print_json(&client.products().list().await?),
        ProductAction::Update { id, data } => {
            print_json(&client.products().patch(id, &parse_data(&data)?).await?)
        },
        ProductAction::Categories { action } => handle_taxonomy(client.categories(), action).await,
        ProductAction::Subcategories { action } => {
            handle_taxonomy(client.subcategories(), action).await
        },
        ProductAction::Tags { action } => handle_taxonomy(client.tags(), action).await,
    }
}

async fn handle_taxonomy<T>(resource: Resource<'_, T>, action: TaxonomyAction) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    match action {
        TaxonomyAction::List => handle_crud(resource, CrudAction::List { cached: false }).await,
        TaxonomyAction::Create { data } => handle_crud(resource, CrudAction::Create { data }).await,
    }
}
