use std::time::{SystemTime, UNIX_EPOCH};

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    salesdesk_auth::jwt,
    secrecy::{ExposeSecret, Secret},
    tracing::warn,
};

use crate::Context;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in and store the session tokens.
    Login {
        #[arg(long, short)]
        username: String,
        /// Password; read from SALESDESK_PASSWORD when omitted.
        #[arg(long, env = "SALESDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Skip fetching reference data after login.
        #[arg(long)]
        no_prefetch: bool,
    },
    /// Show the current session.
    Status,
    /// Forget the session and cached data.
    Logout {
        /// Keep cached reference data; only the credentials are removed.
        #[arg(long)]
        keep_cache: bool,
    },
    /// Exchange the refresh token for a new access token now.
    Refresh,
}

pub async fn handle_auth(ctx: &Context, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login {
            username,
            password,
            no_prefetch,
        } => login(ctx, &username, password, no_prefetch).await,
        AuthAction::Status => status(ctx),
        AuthAction::Logout { keep_cache } => logout(ctx, keep_cache),
        AuthAction::Refresh => refresh(ctx).await,
    }
}

async fn login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
    no_prefetch: bool,
) -> Result<()> {
    let Some(password) = password.filter(|p| !p.is_empty()).map(Secret::new) else {
        bail!("a password is required: pass --password or set SALESDESK_PASSWORD");
    };

    ctx.client.login(username, &password).await?;
    println!("Logged in as {username}");

    if ctx.config.cache.prefetch_on_login && !no_prefetch {
        // The session is usable without reference data.
        match ctx.client.prefetch_reference_data().await {
            Ok(summary) => println!(
                "Cached {} sales reps, {} branch accounts, {} root accounts, {} invoices",
                summary.sales_reps,
                summary.branch_accounts,
                summary.root_accounts,
                summary.invoices
            ),
            Err(e) => warn!(error = %e, "failed to prefetch reference data"),
        }
    }
    Ok(())
}

fn status(ctx: &Context) -> Result<()> {
    let credentials = ctx.client.credentials();
    let Some(token) = credentials.access_token()? else {
        println!("Not logged in.");
        return Ok(());
    };
    let now = unix_now();
    let user = credentials.username()?.unwrap_or_else(|| "unknown user".into());
    let refresh = if credentials.refresh_token()?.is_some() {
        "present"
    } else {
        "missing"
    };

    println!("{user} @ {}", ctx.client.base_url());
    println!(
        "  access token  [{}]",
        jwt::describe_expiry(token.expose_secret(), now)
    );
    println!("  refresh token [{refresh}]");
    println!("  session file  {}", ctx.session_path.display());
    Ok(())
}

fn logout(ctx: &Context, keep_cache: bool) -> Result<()> {
    if keep_cache {
        ctx.client.logout_keep_cache()?;
    } else {
        ctx.client.logout()?;
    }
    println!("Logged out.");
    Ok(())
}

async fn refresh(ctx: &Context) -> Result<()> {
    let token = ctx.client.refresh_token().await?;
    let now = unix_now();
    println!(
        "Access token refreshed [{}]",
        jwt::describe_expiry(token.expose_secret(), now)
    );
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
