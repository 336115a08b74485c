//! Bounded remote calls

use jobdeck_client::ClientError;
use std::future::Future;
use std::time::Duration;

/// Runs a remote call under a deadline; an elapsed deadline is a `Timeout`
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(format!(
            "no response within {:?}",
            limit
        ))),
    }
}
