//! Command-line front end for the model fetcher
//!
//! Reads model links from a text file and/or `--url` flags and downloads each
//! model's preferred export into the output directory.

use anyhow::{Context, bail};
use clap::Parser;
use modelfetch::{
    Browser, ConsoleProgressReporter, CookieSource, Credentials, FailureKind, FetchConfig, InputSource,
    IntoProgressCallback, Resolver, RunSummary, Runner, TextFileSource, UrlListSource, collect_references,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "modelfetch")]
#[command(about = "Download 3D models from Sketchfab in the best available format")]
#[command(version)]
struct Args {
    /// Text file to scan for model links
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Model link to download (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Directory the archives are saved to
    #[arg(short, long, value_name = "DIR", default_value = "sketchfab_models")]
    output_dir: PathBuf,

    /// Personal API token
    #[arg(long, env = "SKETCHFAB_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Netscape cookies.txt exported from a logged-in browser session
    #[arg(long, value_name = "FILE", conflicts_with = "browser")]
    cookies: Option<PathBuf>,

    /// Read session cookies from a local browser (chrome, firefox, edge, brave, any)
    #[arg(long, value_name = "BROWSER")]
    browser: Option<Browser>,

    /// Seconds to wait between API requests
    #[arg(long, value_name = "SECS", default_value_t = 2.0)]
    delay: f64,

    /// Re-download archives that already exist
    #[arg(long)]
    overwrite: bool,

    /// API origin
    #[arg(long, value_name = "URL", default_value = modelfetch::DEFAULT_API_BASE)]
    api_base: String,

    /// Verbose output (debug logging and full download URLs)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn sources(&self) -> Vec<Box<dyn InputSource>> {
        let mut sources: Vec<Box<dyn InputSource>> = Vec::new();
        if let Some(path) = &self.input {
            sources.push(Box::new(TextFileSource::new(path)));
        }
        if !self.urls.is_empty() {
            sources.push(Box::new(UrlListSource::new(self.urls.iter().cloned())));
        }
        sources
    }

    fn cookie_source(&self) -> Option<CookieSource> {
        match (&self.cookies, self.browser) {
            (Some(path), _) => Some(CookieSource::File(path.clone())),
            (None, Some(browser)) => Some(CookieSource::Browser(browser)),
            (None, None) => None,
        }
    }

    fn config(&self) -> anyhow::Result<FetchConfig> {
        let delay = match Duration::try_from_secs_f64(self.delay) {
            Ok(delay) => delay,
            Err(e) => bail!("--delay must be a non-negative number of seconds, got {} ({})", self.delay, e),
        };

        Ok(FetchConfig::default()
            .with_output_dir(&self.output_dir)
            .with_api_base(self.api_base.clone())
            .with_request_delay(delay)
            .with_overwrite(self.overwrite))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let sources = args.sources();
    if sources.is_empty() {
        bail!("No input given: pass a text file to scan or at least one --url");
    }

    let references = collect_references(&sources).context("Failed to read model links")?;
    if references.is_empty() {
        bail!("No Sketchfab model links found in the given input");
    }

    let config = args.config()?;
    let credentials = Credentials::resolve(args.token.as_deref(), args.cookie_source().as_ref(), &config.api_base)
        .context("Failed to set up credentials")?;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;

    println!("🚀 Sketchfab model downloader");
    println!("🔗 Found {} model link(s)", references.len());
    println!("🔑 Authentication: {}", credentials.describe());
    info!("Output directory: {}", config.output_dir.display());

    let resolver = Resolver::new(config, credentials)?
        .with_progress(ConsoleProgressReporter::new(args.verbose).into_callback());
    let summary = Runner::new(resolver).run(&references).await;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(70));
    println!("📊 DOWNLOAD SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "✅ Downloaded: {}/{} ({:.0}% on disk)",
        summary.successful,
        summary.attempted,
        summary.success_rate() * 100.0
    );
    if summary.already_present > 0 {
        println!("📁 Already present: {}", summary.already_present);
    }
    if summary.failed > 0 {
        println!("❌ Failed: {}", summary.failed);
        for (kind, count) in &summary.failures {
            println!("   - {}: {}", kind, count);
        }
    }
    println!(
        "💾 Transferred: {:.2} MB in {:.1}s",
        summary.total_bytes as f64 / 1_048_576.0,
        summary.duration.as_secs_f64()
    );
    println!("📂 Output: {}", summary.output_dir.display());

    if summary.failures_of(FailureKind::AuthenticationRequired) > 0 {
        println!("\n💡 Some models need a login: pass --token, --browser or --cookies with a logged-in session");
    }
    if summary.failures_of(FailureKind::TransferFailure) > 0 {
        println!("💡 Transfer failures are often transient; re-run with the failed links");
    }
}
