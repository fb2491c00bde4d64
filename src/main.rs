//! CLI entry point for request-kit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use regex::Regex;
use request_kit::{
    ClientConfig, HttpClient, Outcome, ProxyConfig, RequestPool, TraceLog, load_config_file,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = client_config(&args)?;
    let primary = HttpClient::new(config).context("building HTTP client")?;
    let retry_client = match &args.retry_socks5 {
        Some(addr) => Some(
            primary
                .with_proxy(Some(ProxyConfig::socks5(addr)))
                .context("building retry client")?,
        ),
        None => None,
    };

    let pool = RequestPool::new(Arc::new(primary));
    let (mut request, mut response) = pool.acquire_pair();
    let trace = TraceLog::new();

    request
        .method(&args.method)
        .uri(&args.url)
        .max_redirects(usize::from(args.max_redirects))
        .retry(u32::from(args.retry));
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("header must be \"Name: value\", got {header:?}");
        };
        request.header(name.trim(), value.trim());
    }
    if let Some(body) = &args.data {
        request.body_raw(body.as_str());
    }
    if let Some(host) = &args.host {
        request.host(host);
    }
    if let Some(user) = &args.user {
        let (name, password) = user.split_once(':').unwrap_or((user.as_str(), ""));
        request.basic_auth(name, password);
    }
    if let Some(secs) = args.timeout {
        request.timeout(Duration::from_secs(secs));
    }
    if let Some(client) = retry_client {
        request.retry_client(Arc::new(client));
    }
    if args.trace {
        request.with_trace(&trace);
    }

    let outcome = request
        .send(&mut response)
        .await
        .with_context(|| format!("{} {}", args.method, args.url))?;
    if outcome == Outcome::Canceled {
        warn!("request was canceled; response may be incomplete");
    }
    info!(status = %response.status(), bytes = response.body().len(), "response received");

    if args.title {
        println!("{}", response.title());
    } else if let Some(pattern) = &args.search {
        let pattern = Regex::new(pattern).context("invalid --search pattern")?;
        println!("{}", serde_json::to_string_pretty(&response.search(&pattern))?);
    } else {
        if args.include {
            print!("{}", response.wire().header_block());
        }
        println!("{}", response.text());
    }

    if args.trace {
        println!("{}", trace.to_json()?);
    }

    pool.release_pair(request, response);
    Ok(())
}

/// Loads the config file (if any) and applies flag overrides.
fn client_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => ClientConfig::default(),
    };

    if let Some(addr) = &args.proxy {
        config.proxy = Some(ProxyConfig::http(addr));
    } else if let Some(addr) = &args.socks5 {
        config.proxy = Some(ProxyConfig::socks5(addr));
    }

    config.validate()?;
    Ok(config)
}
