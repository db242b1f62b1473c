use {
    anyhow::{Context as _, Result, bail},
    clap::Subcommand,
    tracing::info,
    url::Url,
};

use crate::{Context, print_json};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Point salesdesk at another API, e.g. https://sales.example.com/api.
    SetBaseUrl { url: String },
}

pub fn handle_config(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            eprintln!(
                "config file: {}",
                salesdesk_config::find_or_default_config_path().display()
            );
            print_json(&ctx.config)
        },
        ConfigAction::SetBaseUrl { url } => set_base_url(&url),
    }
}

fn validate_base_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).with_context(|| format!("'{raw}' is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("base url must use http or https, got '{}'", parsed.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn set_base_url(raw: &str) -> Result<()> {
    let base_url = validate_base_url(raw)?;
    let path = salesdesk_config::update_config(|cfg| cfg.api.base_url = base_url.clone())?;
    info!(path = %path.display(), %base_url, "base url updated");
    println!("Saved api.base_url = {base_url} to {}", path.display());
    Ok(())
}
