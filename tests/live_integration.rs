use http_retrier::{RetryClient, RetryOptions};

fn load_live_url() -> Result<String, String> {
    let url = std::env::var("HTTP_RETRIER_LIVE_URL")
        .map_err(|_| "HTTP_RETRIER_LIVE_URL env is required".to_owned())?;
    if url.trim().is_empty() {
        return Err("HTTP_RETRIER_LIVE_URL is set but empty".to_owned());
    }
    Ok(url)
}

#[tokio::test]
async fn live_get_with_env_options() {
    let url = match load_live_url() {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping live test: HTTP_RETRIER_LIVE_URL not set");
            return;
        }
    };

    let opts = RetryOptions::from_env().expect("HTTP_RETRY_* env vars must parse");
    let client = RetryClient::from_options(&opts);

    let response = client.get(&url).await.expect("live request must succeed");
    assert!(response.status().as_u16() < 500);

    let body = response.bytes().await.expect("live body must be readable");
    eprintln!("live response: {} bytes", body.len());
}
