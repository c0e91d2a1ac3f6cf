// ABOUTME: Stream aggregation — turns one API call's fragment stream into a complete response.
// ABOUTME: Forwards each fragment to live output as it arrives; honors idle timeout and cancellation.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::agent::provider::ApiBinding;
use crate::console::LiveOutput;
use crate::error::ConversationError;

/// Await `fut`, bounded by the idle timeout and raced against cancellation.
async fn wait<F: Future>(
    fut: F,
    idle_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<F::Output, ConversationError> {
    let bounded = async {
        match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                ConversationError::api(format!("no data received for {}s", limit.as_secs()))
            }),
            None => Ok(fut.await),
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConversationError::CancellationRequested),
        result = bounded => result,
    }
}

/// Issue one streaming request for `prompt` and return the concatenated text.
///
/// Every fragment is appended and forwarded to `live` before the next one is
/// requested. Any failure discards the partial text and returns a single
/// `ApiCallFailed`; cancellation drops the in-flight stream and returns
/// `CancellationRequested`.
pub async fn aggregate(
    binding: &dyn ApiBinding,
    prompt: &str,
    live: &mut dyn LiveOutput,
    idle_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<String, ConversationError> {
    let mut stream = wait(binding.stream_complete(prompt), idle_timeout, cancel)
        .await?
        .map_err(|e| ConversationError::api(e.to_string()))?;

    let mut text = String::new();
    while let Some(item) = wait(stream.next(), idle_timeout, cancel).await? {
        let fragment = item.map_err(|e| ConversationError::api(e.to_string()))?;
        text.push_str(&fragment);
        live.fragment(&fragment);
    }
    Ok(text)
}
