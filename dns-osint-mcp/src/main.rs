//! MCP Server entry point for the DNS OSINT toolbox
//!
//! Starts the MCP server with stdio transport. Tunables come from the JSON file
//! named by `DNS_OSINT_CONFIG`; without it the built-in defaults apply.

mod schemas;
mod server;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use dns_osint_toolbox::{OsintConfig, OsintService};
use rmcp::ServiceExt;
use server::DnsOsintMcp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG_ENV: &str = "DNS_OSINT_CONFIG";

fn load_config(path: &Path) -> anyhow::Result<OsintConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: OsintConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

fn build_service() -> anyhow::Result<OsintService> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = Path::new(&path);
            tracing::info!("Loading configuration from {}", path.display());
            load_config(path)?
        }
        None => OsintConfig::default(),
    };
    OsintService::with_config(config).context("configuration rejected")
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing to stderr (MCP uses stdout for protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Starting DNS OSINT MCP Server");

    let service = match build_service() {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to initialize toolbox: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        "Toolbox ready: rate limit {}/s per resolver, max {} workers",
        service.config().rate_limit,
        service.config().max_workers
    );

    let mcp_server = DnsOsintMcp::new(service);

    // Start serving via stdio
    tracing::info!("Starting MCP server on stdio transport");
    let running = match mcp_server.serve(rmcp::transport::stdio()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Wait for the server to complete
    if let Err(e) = running.waiting().await {
        tracing::error!("MCP server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_config_reads_partial_json() {
        let path = std::env::temp_dir().join(format!("dns-osint-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "rate_limit": 5, "max_workers": 20 }"#).unwrap();

        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.max_workers, 20);
        assert_eq!(config.default_timeout_secs, OsintConfig::default().default_timeout_secs);
    }

    #[test]
    fn load_config_missing_file_names_path() {
        let error = load_config(Path::new("/nonexistent/dns-osint.json")).unwrap_err();
        assert!(format!("{error:#}").contains("/nonexistent/dns-osint.json"));
    }
}
