//! Fetch OMDb metadata for a list of IMDb ids into a JSON cache for `seed`.

use std::path::PathBuf;

use clap::Parser;
use reelshelf::importer::{OmdbClient, BATCH_DELAY};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "import_movies")]
#[command(about = "Fetch OMDb metadata into a local JSON cache", long_about = None)]
struct Args {
    /// JSON array of IMDb ids
    #[arg(long, value_name = "FILE", default_value = "data/movie_ids.json")]
    ids: PathBuf,

    /// Where to write the cache, keyed by IMDb id
    #[arg(long, value_name = "FILE", default_value = "data/movies.json")]
    out: PathBuf,

    #[arg(long, env = "OMDB_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "OMDB_BASE_URL", default_value = "http://www.omdbapi.com/")]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelshelf=info")),
        )
        .init();
    let args = Args::parse();

    let ids: Vec<String> = serde_json::from_str(&tokio::fs::read_to_string(&args.ids).await?)?;
    tracing::info!(count = ids.len(), "Importing movies");

    let client = OmdbClient::new(&args.base_url, Some(args.api_key));
    let outcome = client.import_batch(&ids, BATCH_DELAY).await;

    tokio::fs::write(&args.out, serde_json::to_string_pretty(&outcome.records)?).await?;
    tracing::info!(
        saved = outcome.records.len(),
        failed = outcome.failed.len(),
        out = %args.out.display(),
        "Import finished"
    );
    if !outcome.failed.is_empty() {
        tracing::warn!("Failed ids: {}", outcome.failed.join(", "));
    }
    Ok(())
}
