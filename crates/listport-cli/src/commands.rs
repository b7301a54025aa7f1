//! Subcommand handlers. Product JSON goes to stdout; logs go to stderr.

use listport_core::{AppConfig, Platform};
use listport_scraper::{
    detect_platform, estimate_scrape_cost, extract_product_id, format_cost_for_display,
    normalize_url, CancellationToken, Orchestrator, ScraperError,
};

/// Scrape one URL through the configured provider chains.
///
/// Ctrl-C cancels the scrape in flight.
///
/// # Errors
///
/// Returns an error prefixed with the failure category and its hint when the
/// scrape fails, or if the product cannot be serialized.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    url: &str,
    force_refresh: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_app_config(config).map_err(describe)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling scrape");
            on_interrupt.cancel();
        }
    });

    let result = orchestrator
        .scrape_with_report(url, force_refresh, &cancel)
        .await;
    interrupt.abort();
    let report = result.map_err(describe)?;

    for attempt in &report.attempts {
        tracing::debug!(attempt = %attempt.summary(), "scrape attempt");
    }

    let product = &report.product;
    let json = if pretty {
        serde_json::to_string_pretty(product)?
    } else {
        serde_json::to_string(product)?
    };
    println!("{json}");

    if let Some(cost) = &product.cost_metadata {
        eprintln!(
            "provider: {}  attempts: {}  estimated cost: {}  ({} ms)",
            cost.provider,
            report.attempts.len(),
            format_cost_for_display(cost.estimated_cost_usd),
            cost.duration_ms
        );
    }
    Ok(())
}

/// Print what URL detection makes of `url`.
///
/// # Errors
///
/// Returns an error if the URL is not a supported marketplace.
pub(crate) fn run_detect(url: &str) -> anyhow::Result<()> {
    let platform = detect_platform(url).ok_or_else(|| {
        describe(ScraperError::UnsupportedUrl {
            url: url.to_owned(),
        })
    })?;

    println!("platform:  {}", platform.display_name());
    println!(
        "id:        {}",
        extract_product_id(url, platform).as_deref().unwrap_or("-")
    );
    println!(
        "canonical: {}",
        normalize_url(url, platform).as_deref().unwrap_or("-")
    );
    Ok(())
}

/// List registered providers, vision status and the chain per platform.
///
/// # Errors
///
/// Returns an error when no provider credentials are configured.
pub(crate) fn run_providers(config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_app_config(config).map_err(describe)?;
    let available = orchestrator.available_providers();

    println!("registered: {}", available.join(", "));
    println!(
        "vision:     {}",
        if orchestrator.has_vision() {
            config.vision_model.as_str()
        } else {
            "not configured"
        }
    );

    let scraping = orchestrator.config();
    for platform in Platform::ALL {
        let chain = chain_line(scraping.chain_for(platform), &available);
        println!("{:<11} {chain}", format!("{platform}:"));
    }
    Ok(())
}

pub(crate) fn run_cost(provider: &str, platform: Platform) {
    let cost = estimate_scrape_cost(provider, platform);
    println!("{provider} on {}: {cost:.3} USD", platform.display_name());
}

/// Renders a chain, marking entries with no registered provider.
fn chain_line(chain: &[String], available: &[String]) -> String {
    chain
        .iter()
        .map(|name| {
            if available.contains(name) {
                name.clone()
            } else {
                format!("{name} (not registered)")
            }
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn describe(e: ScraperError) -> anyhow::Error {
    let category = e.category();
    anyhow::anyhow!("{category} error: {e}\nhint: {}", category.hint())
}
