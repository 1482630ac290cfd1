use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zakki_client::ZakkiClient;
use zakki_common::{Config, SortMethod};
use zakki_tagloader::render::{render_page, view_json};
use zakki_tagloader::loader::join_reporter;
use zakki_tagloader::{initialize_tag_page, TagLoader};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Json,
}

#[derive(Parser)]
#[command(name = "zakki-tags", about = "Collect every diary section carrying a tag")]
struct Cli {
    /// Tag to collect (letters, digits, `_` and `-`)
    tag: String,

    /// Site origin; overrides ZAKKI_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    /// Months scanned concurrently
    #[arg(long)]
    batch_size: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// date-desc, date-asc, relevance-desc or relevance-asc
    #[arg(long, default_value = "date-desc")]
    sort: SortMethod,

    /// Hide entries below this relevance (0-100)
    #[arg(long, default_value_t = 0)]
    min_relevance: i64,

    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Write here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "ZAKKI_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.fetch_timeout = std::time::Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("zakki=info".parse()?));
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    config.log_redacted();

    let client = ZakkiClient::new(&config.base_url, config.fetch_timeout)?;
    let loader = TagLoader::new(Arc::new(client), &config);

    let reporter = loader.spawn_progress_reporter();

    let loaded = initialize_tag_page(&cli.tag, &loader).await;
    // closing the channel ends the reporter
    drop(loader);
    join_reporter(reporter).await;
    let mut controller = loaded?;

    controller.set_sort_method(cli.sort);
    controller.set_min_relevance(cli.min_relevance);

    let stats = controller.stats();
    info!(
        tag = cli.tag.as_str(),
        total = stats.total,
        shown = stats.shown,
        sort = %cli.sort,
        "Tag page ready"
    );

    let output = match cli.format {
        Format::Html => render_page(&controller).to_html(),
        Format::Json => view_json(&controller)?,
    };

    match &cli.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{output}"),
    }

    Ok(())
}
