use std::time::Duration;

use superghost::prelude::*;
use tracing_subscriber::EnvFilter;

/// Used when `SUPERGHOST_WORDS` is unset.
const FALLBACK_WORDS: &str = "
    apple bread chair dance eagle flame ghost grape house juice knife lemon
    money night ocean piano queen river stone table tiger water zebra
    testing ghoul ghostly
";

/// Reads a whitespace-separated word list, or the built-in one if no
/// path is given.
async fn load_dictionary(path: Option<&str>) -> std::io::Result<Dictionary> {
    match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            Ok(Dictionary::parse(&text))
        }
        None => Ok(Dictionary::parse(FALLBACK_WORDS)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = std::env::var("SUPERGHOST_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let words_path = std::env::var("SUPERGHOST_WORDS").ok();
    let dictionary = load_dictionary(words_path.as_deref()).await?;
    tracing::info!(
        words = dictionary.len(),
        source = words_path.as_deref().unwrap_or("built-in"),
        "dictionary loaded"
    );

    let server = SuperghostServerBuilder::new()
        .bind(&addr)
        .idle_timeout(Duration::from_secs(30 * 60))
        .eviction_period(Duration::from_secs(60))
        .build(dictionary)
        .await?;
    tracing::info!(%addr, "starting superghost server");

    server.run().await?;
    Ok(())
}
