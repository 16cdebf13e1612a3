//! Bounded retry with exponential backoff for external API calls.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `max_retries` times, sleeping with exponential backoff
/// between failures. The last error surfaces unchanged once the attempt
/// budget is spent. `what` labels the operation in log output.
pub(crate) async fn with_retries<T, E, Fut>(
    max_retries: u32,
    what: &str,
    mut op: impl FnMut() -> Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(120)),
        ..Default::default()
    };
    let mut attempts = 0;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_retries {
                    tracing::error!(error = %e, what, "Retries exhausted");
                    return Err(e);
                }
                match backoff.next_backoff() {
                    Some(delay) => {
                        tracing::warn!(
                            error = %e,
                            retry_in_ms = delay.as_millis(),
                            what,
                            "Call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(error = %e, what, "Backoff budget exhausted");
                        return Err(e);
                    }
                }
            }
        }
    }
}
