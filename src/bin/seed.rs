//! Load the cached OMDb records into the database for a demo account.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use reelshelf::accounts::hash_password;
use reelshelf::catalog;
use reelshelf::db::{self, PgStore, Store};
use reelshelf::importer::{normalize, OmdbResponse};
use reelshelf::models::user::NewUser;
use reelshelf::reminders::today_window;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Seed a demo user and their movies from the OMDb cache", long_about = None)]
struct Args {
    /// Cache written by `import_movies`
    #[arg(long, value_name = "FILE", default_value = "data/movies.json")]
    cache: PathBuf,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, default_value = "user")]
    username: String,

    #[arg(long, default_value = "user@user.com")]
    email: String,

    #[arg(long, default_value = "123456")]
    password: String,

    #[arg(long, env = "REMINDER_TIMEZONE", default_value = "America/Sao_Paulo")]
    timezone: String,
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

    let tz: Tz = args
        .timezone
        .parse()
        .map_err(|_| format!("unknown timezone {}", args.timezone))?;
    let (today, _) = today_window(Utc::now(), tz);

    let cache: BTreeMap<String, OmdbResponse> =
        serde_json::from_str(&tokio::fs::read_to_string(&args.cache).await?)?;

    let store = PgStore::new(db::connect(&args.database_url).await?);

    let user = match store.find_user_by_login(&args.username).await? {
        Some(user) => user,
        None => {
            store
                .create_user(NewUser {
                    name: "User".to_string(),
                    email: args.email.clone(),
                    username: args.username.clone(),
                    password_hash: hash_password(&args.password)?,
                })
                .await?
        }
    };

    let mut seeded = 0usize;
    for (id, raw) in cache {
        let record = normalize(raw, today);
        if record.imdb_id.is_none() {
            tracing::warn!(imdb_id = %id, "Cached record has no IMDb id, skipping");
            continue;
        }
        catalog::save_imported(&store, user.id, &record.into_draft(), today).await?;
        seeded += 1;
    }

    tracing::info!(
        movies = seeded,
        username = %args.username,
        "Database seeded; sign in with the demo credentials"
    );
    Ok(())
}
