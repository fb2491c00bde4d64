//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Send one HTTP request and print the decoded response.
///
/// Retries transient failures, follows redirects when asked, keeps cookies
/// across the redirect chain and decodes non-UTF-8 bodies.
#[derive(Parser, Debug)]
#[command(name = "request-kit")]
#[command(author, version, about)]
pub struct Args {
    /// Target URL
    pub url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Header in "Name: value" form (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Raw request body; the content type is inferred
    #[arg(short, long)]
    pub data: Option<String>,

    /// Client configuration file (key = value lines)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Redirect budget (0 and 1 disable redirect following)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u16).range(0..=100))]
    pub max_redirects: u16,

    /// Retry attempts after a timeout or closed connection (0-10)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retry: u8,

    /// Per-call deadline in seconds
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// HTTP proxy for the primary client (host:port)
    #[arg(long, conflicts_with = "socks5")]
    pub proxy: Option<String>,

    /// SOCKS5 proxy for the primary client (host:port)
    #[arg(long)]
    pub socks5: Option<String>,

    /// SOCKS5 proxy used only for retry attempts (host:port)
    #[arg(long)]
    pub retry_socks5: Option<String>,

    /// Override the Host header (and the TLS server name for https)
    #[arg(long)]
    pub host: Option<String>,

    /// Basic auth credentials in "user:password" form
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Print the status line and headers before the body
    #[arg(short = 'i', long)]
    pub include: bool,

    /// Print only the page title
    #[arg(long, conflicts_with = "search")]
    pub title: bool,

    /// Print the named groups of this regex, matched against the body, as JSON
    #[arg(long)]
    pub search: Option<String>,

    /// Print the call trace as JSON after the response
    #[arg(long)]
    pub trace: bool,
}
