use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::Config;
use crate::error::{DecodeError, FeedError};
use crate::models::MetricsSnapshot;

pub const FEED_CHANNEL_CAPACITY: usize = 64;

/// What the listener publishes to the view.
#[derive(Debug)]
pub enum FeedEvent {
    Connecting { attempt: u32 },
    Connected,
    Snapshot(MetricsSnapshot),
    Malformed(DecodeError),
    Disconnected { reason: String },
}

/// Connection parameters for one feed subscription.
#[derive(Debug, Clone)]
pub struct FeedListener {
    pub endpoint: String,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// 0 keeps retrying forever.
    pub max_retries: u32,
}

impl From<&Config> for FeedListener {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            backoff_initial_ms: config.backoff_initial_ms,
            backoff_max_ms: config.backoff_max_ms,
            max_retries: config.max_retries,
        }
    }
}

impl FeedListener {
    /// Starts the listener task. The connection lives as long as the returned handle.
    pub fn spawn(self) -> FeedHandle {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(self, tx, cancel.clone()));
        FeedHandle {
            events: rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Owns the listener task. Dropping it cancels the task, which closes the socket.
pub struct FeedHandle {
    events: mpsc::Receiver<FeedEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<(), FeedError>>>,
}

impl FeedHandle {
    /// Takes up to `limit` pending events without waiting.
    pub fn drain_pending(&mut self, limit: usize) -> Vec<FeedEvent> {
        let mut pending = Vec::new();
        while pending.len() < limit {
            match self.events.try_recv() {
                Ok(event) => pending.push(event),
                Err(_) => break,
            }
        }
        pending
    }

    /// Waits for the next event; `None` once the listener has stopped.
    #[cfg(test)]
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Cancels the listener and waits for it to release the connection.
    pub async fn shutdown(mut self) -> Result<(), FeedError> {
        self.cancel.cancel();
        self.events.close();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "feed task did not finish cleanly");
                    Ok(())
                }
            },
            None => Ok(()),
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum PumpExit {
    Stopped,
    Lost(FeedError),
}

async fn run(
    listener: FeedListener,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
) -> Result<(), FeedError> {
    let mut backoff = Backoff::new(listener.backoff_initial_ms, listener.backoff_max_ms);

    loop {
        let attempt = backoff.attempts() + 1;
        if !publish(&tx, &cancel, FeedEvent::Connecting { attempt }).await {
            return Ok(());
        }
        info!(endpoint = %listener.endpoint, attempt, "connecting to metrics feed");

        let connected = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = connect_async(listener.endpoint.as_str()) => result,
        };

        // Only failed connects count against max_retries; a dropped live link always retries.
        let (lost, connect_failed) = match connected {
            Ok((stream, _)) => {
                backoff.reset();
                info!(endpoint = %listener.endpoint, "metrics feed connected");
                if !publish(&tx, &cancel, FeedEvent::Connected).await {
                    return Ok(());
                }
                match pump(stream, &tx, &cancel).await {
                    PumpExit::Stopped => return Ok(()),
                    PumpExit::Lost(err) => (err, false),
                }
            }
            Err(source) => (
                FeedError::Connect {
                    endpoint: listener.endpoint.clone(),
                    source,
                },
                true,
            ),
        };

        let delay = if connect_failed {
            backoff.next_delay()
        } else {
            backoff.initial()
        };
        warn!(error = %lost, retry_in_ms = delay.as_millis() as u64, "metrics feed unavailable");

        if connect_failed
            && listener.max_retries > 0
            && backoff.attempts() >= listener.max_retries
        {
            let gave_up = FeedError::GaveUp(backoff.attempts());
            warn!(error = %gave_up, "metrics feed listener stopping");
            publish(
                &tx,
                &cancel,
                FeedEvent::Disconnected {
                    reason: gave_up.to_string(),
                },
            )
            .await;
            return Err(gave_up);
        }

        let event = FeedEvent::Disconnected {
            reason: lost.to_string(),
        };
        if !publish(&tx, &cancel, event).await {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Reads frames until the link drops or the listener is cancelled.
async fn pump<S>(
    stream: WebSocketStream<S>,
    tx: &mpsc::Sender<FeedEvent>,
    cancel: &CancellationToken,
) -> PumpExit
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            frame = read.next() => Some(frame),
        };

        let frame = match next {
            None => {
                debug!("closing metrics feed");
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(error = %e, "close frame not delivered");
                }
                return PumpExit::Stopped;
            }
            Some(frame) => frame,
        };

        let decoded = match frame {
            Some(Ok(Message::Text(text))) => MetricsSnapshot::decode(text.as_str(), Utc::now()),
            Some(Ok(Message::Binary(data))) => std::str::from_utf8(&data)
                .map_err(DecodeError::from)
                .and_then(|text| MetricsSnapshot::decode(text, Utc::now())),
            Some(Ok(Message::Close(_))) | None => return PumpExit::Lost(FeedError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return PumpExit::Lost(FeedError::Receive(e)),
        };

        let event = match decoded {
            Ok(snapshot) => {
                debug!(
                    cpu = snapshot.cpu_percent,
                    gpus = snapshot.gpu_info.len(),
                    "metrics snapshot received"
                );
                FeedEvent::Snapshot(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed metrics message");
                FeedEvent::Malformed(e)
            }
        };

        if !publish(tx, cancel, event).await {
            if let Err(e) = write.send(Message::Close(None)).await {
                debug!(error = %e, "close frame not delivered");
            }
            return PumpExit::Stopped;
        }
    }
}

/// Sends `event` unless the listener is cancelled or the view has gone away.
async fn publish(tx: &mpsc::Sender<FeedEvent>, cancel: &CancellationToken, event: FeedEvent) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}
