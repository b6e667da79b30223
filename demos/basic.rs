use std::time::Duration;

use http_retrier::{RetryClient, StrategyKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("HTTP_RETRIER_URL")?;

    let client = RetryClient::builder()
        .with_max_retries(4)
        .with_retry_strategy(StrategyKind::Jitter)
        .with_retry_base_delay(Duration::from_millis(300))
        .with_retry_max_delay(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(20))
        .build();

    let response = client.get(&url).await?;
    println!("status: {}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
