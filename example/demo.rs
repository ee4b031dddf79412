use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ttl_cache::LocalCache;

const SWEEP_INTERVAL_MS: u64 = 200;
const SHORT_TTL_MS: u64 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ttl_cache=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cache = LocalCache::builder()
        .sweep_interval(Duration::from_millis(SWEEP_INTERVAL_MS))
        .build()?;

    cache.set("greeting", "hello".to_string(), Duration::ZERO);
    cache.set("session", "abc123".to_string(), Duration::from_millis(SHORT_TTL_MS));

    println!("greeting: {}", cache.get("greeting")?);
    println!("session: {}", cache.get("session")?);
    println!("Cache size: {}", cache.len());

    println!("Waiting for the session to expire...");
    tokio::time::sleep(Duration::from_millis(SHORT_TTL_MS * 2)).await;
    match cache.get("session") {
        Ok(value) => println!("session still cached: {}", value),
        Err(err) => println!("session: {}", err),
    }

    println!("Adding short-lived keys nobody will read:");
    for i in 0..10 {
        cache.set(format!("temp_{}", i), format!("value_{}", i), Duration::from_millis(SHORT_TTL_MS));
    }
    println!("Cache size with temp keys: {}", cache.len());

    tokio::time::sleep(Duration::from_millis(SWEEP_INTERVAL_MS * 2)).await;
    println!("Cache size after sweep: {}", cache.len());

    cache.delete("greeting");
    println!("Cache size after deletion: {}", cache.len());

    cache.shutdown().await;
    Ok(())
}
