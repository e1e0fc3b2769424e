use volley::report::Report;
use volley::*;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Method;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the target
    url: String,

    /// Number of concurrent workers
    #[arg(short, default_value_t = 10)]
    c: usize,

    /// Duration of the test in seconds
    #[arg(short, default_value_t = 10)]
    d: u64,

    /// Response-header timeout per request in milliseconds (0 disables it)
    #[arg(short, default_value_t = 1000)]
    t: u64,

    /// HTTP method
    #[arg(short, default_value = "GET")]
    m: String,

    /// Headers sent to the target, as `name1:value1;name2:value2`
    #[arg(short = 'H', default_value = "")]
    headers: String,

    /// Disable keep-alive
    #[arg(short)]
    k: bool,

    /// Disable compression (no `Accept-Encoding` header)
    #[arg(long)]
    compress: bool,

    /// Hand 301/307 responses back instead of following them
    #[arg(long)]
    no_follow_redirects: bool,

    /// Request body
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the request body from a file
    #[arg(long)]
    body_file: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging and per-worker results
    #[arg(long)]
    debug: bool,
}

fn seconds_to_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.debug);

    let body = match (args.body, args.body_file) {
        (Some(body), _) => Some(body.into_bytes().into()),
        (None, Some(path)) => Some(std::fs::read(&path).map_err(ConfigError::from)?.into()),
        (None, None) => None,
    };

    let config = WorkerConfig {
        url: args.url.clone(),
        concurrency: args.c,
        duration: Duration::from_secs(args.d),
        timeout: Duration::from_millis(args.t),
        headers: args.headers,
        method: Method::from_bytes(args.m.to_uppercase().as_bytes())?,
        disable_keep_alive: args.k,
        disable_compression: args.compress,
        follow_redirects: !args.no_follow_redirects,
        body,
    };

    let runner = Runner::new(config)?;

    let interrupt = runner.interrupt();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, waiting for in-flight requests");
            interrupt.stop();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {elapsed_precise}/{msg}")?);
    pb.set_message(seconds_to_hms(args.d));
    pb.enable_steady_tick(Duration::from_millis(100));

    let summary = runner.run().await?;
    pb.finish_and_clear();

    let report = Report::new(&args.url, &summary);
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render(args.debug)?);
    }

    Ok(())
}
