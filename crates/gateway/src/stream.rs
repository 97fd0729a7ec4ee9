//! Venue WebSocket stream with bounded reconnect
//!
//! One task per venue. The task owns the venue's `ConnectionTracker`, keeps the
//! socket alive with heartbeats, and forwards normalized ticks and state
//! changes over an mpsc channel:
//!
//! ```text
//!  venue ws ──► normalize ──► StreamEvent::Tick ──► mpsc ──► pipeline
//!       │
//!       └── drop ──► tracker.connection_lost() ──► RetryAfter | Exhausted
//!                                                                 │
//!                                        WsVenueStream::restart ──┘ tracker.restart()
//! ```
//!
//! Dropping the `WsVenueStream` handle (or calling `shutdown`) ends the task.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use meridian_core::Symbol;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::connection::{ConnectionState, ConnectionTracker, ReconnectDecision, ReconnectPolicy};
use crate::error::FeedError;
use crate::venues::{VenueId, VenueNormalizer, VenueTick, normalizer_for};

/// Events emitted by a venue stream task
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Tick(VenueTick),
    StateChanged {
        venue: VenueId,
        state: ConnectionState,
        attempts: u32,
    },
    /// Reconnect attempts exhausted; the task waits in `FAILED` for a restart
    Exhausted { venue: VenueId, attempts: u32 },
}

/// Settings for one venue stream
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub venue: VenueId,
    pub url: String,
    pub symbols: Vec<Symbol>,
    pub policy: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl StreamSettings {
    pub fn new(venue: VenueId, symbols: Vec<Symbol>, policy: ReconnectPolicy) -> Self {
        Self {
            venue,
            url: venue.default_ws_url().to_string(),
            symbols,
            policy,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Builder: Override the endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Builder: Override the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Handle to a running venue stream task
pub struct WsVenueStream {
    venue: VenueId,
    shutdown: watch::Sender<bool>,
    restart: watch::Sender<u64>,
    handle: JoinHandle<()>,
}

impl WsVenueStream {
    /// Spawn the stream task. Must be called inside a tokio runtime.
    pub fn spawn(settings: StreamSettings, events: mpsc::Sender<StreamEvent>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (restart_tx, restart_rx) = watch::channel(0);
        let venue = settings.venue;
        let handle = tokio::spawn(run_stream(settings, events, shutdown_rx, restart_rx));
        Self {
            venue,
            shutdown: shutdown_tx,
            restart: restart_tx,
            handle,
        }
    }

    pub fn venue(&self) -> VenueId {
        self.venue
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Take a `FAILED` stream back to `DISCONNECTED` and reconnect from scratch
    ///
    /// Only honoured once the task has exhausted its attempts. Returns false
    /// when the task has already ended and must be spawned again.
    pub fn restart(&self) -> bool {
        if self.handle.is_finished() {
            return false;
        }
        self.restart.send_modify(|generation| *generation += 1);
        true
    }

    /// Ask the task to disconnect and wait for it to end
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!("[FEED] {} stream task ended abnormally: {}", self.venue, e);
        }
    }
}

async fn emit_state(events: &mpsc::Sender<StreamEvent>, venue: VenueId, tracker: &ConnectionTracker) {
    let _ = events
        .send(StreamEvent::StateChanged {
            venue,
            state: tracker.state(),
            attempts: tracker.attempts(),
        })
        .await;
}

async fn run_stream(
    settings: StreamSettings,
    events: mpsc::Sender<StreamEvent>,
    mut shutdown: watch::Receiver<bool>,
    mut restart: watch::Receiver<u64>,
) {
    let venue = settings.venue;
    let normalizer = normalizer_for(venue);
    let mut tracker = ConnectionTracker::new(settings.policy.clone());

    loop {
        if let Err(refused) = tracker.begin_connect() {
            error!("[FEED] {} connect refused: {}", venue, refused);
            return;
        }
        emit_state(&events, venue, &tracker).await;
        info!("[FEED] Connecting to {} ({})", venue, settings.url);

        let ended = tokio::select! {
            _ = shutdown.changed() => None,
            err = session(normalizer.as_ref(), &settings, &mut tracker, &events) => Some(err),
        };

        let err = match ended {
            None | Some(FeedError::Stopped) => {
                tracker.disconnect();
                emit_state(&events, venue, &tracker).await;
                info!("[FEED] {} stream stopped", venue);
                return;
            }
            Some(err) => err,
        };

        warn!("[FEED] {} connection lost: {}", venue, err);
        match tracker.connection_lost() {
            ReconnectDecision::RetryAfter(delay) => {
                emit_state(&events, venue, &tracker).await;
                debug!(
                    "[FEED] {} reconnect attempt {}/{} in {:?}",
                    venue,
                    tracker.attempts(),
                    tracker.policy().max_reconnect_attempts,
                    delay
                );
                let stop = tokio::select! {
                    _ = shutdown.changed() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if stop {
                    tracker.disconnect();
                    emit_state(&events, venue, &tracker).await;
                    return;
                }
            }
            ReconnectDecision::Exhausted => {
                // Requests made while the venue was still retrying are dropped
                restart.mark_unchanged();
                emit_state(&events, venue, &tracker).await;
                error!(
                    "[FEED] {} exhausted {} reconnect attempts; giving up",
                    venue,
                    tracker.policy().max_reconnect_attempts
                );
                let _ = events
                    .send(StreamEvent::Exhausted {
                        venue,
                        attempts: tracker.policy().max_reconnect_attempts,
                    })
                    .await;

                let restarted = tokio::select! {
                    _ = shutdown.changed() => false,
                    changed = restart.changed() => changed.is_ok(),
                };
                if !restarted {
                    return;
                }
                tracker.restart();
                emit_state(&events, venue, &tracker).await;
                info!("[FEED] {} stream restarted", venue);
            }
        }
    }
}

/// One connected session. Always ends with the reason it ended;
/// `FeedError::Stopped` means the consumer went away.
async fn session(
    normalizer: &dyn VenueNormalizer,
    settings: &StreamSettings,
    tracker: &mut ConnectionTracker,
    events: &mpsc::Sender<StreamEvent>,
) -> FeedError {
    let connect = tokio::time::timeout(settings.connect_timeout, connect_async(settings.url.as_str()));
    let ws = match connect.await {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => return e.into(),
        Err(_) => return FeedError::Timeout(settings.connect_timeout),
    };

    tracker.connected();
    emit_state(events, settings.venue, tracker).await;
    info!("[FEED] Connected to {}", settings.venue);

    let (mut write, mut read) = ws.split();
    let subscribe = normalizer.subscribe_message(&settings.symbols);
    if let Err(e) = write.send(Message::Text(subscribe.into())).await {
        return e.into();
    }

    let mut heartbeat = tokio::time::interval(normalizer.heartbeat_interval());
    // The first tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let frame = match normalizer.ping_message() {
                    Some(text) => Message::Text(text.into()),
                    None => Message::Ping(Vec::new().into()),
                };
                if let Err(e) = write.send(frame).await {
                    return e.into();
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                    Ok(frame) => {
                        if let Some(tick) = normalizer.normalize(&frame) {
                            if events.send(StreamEvent::Tick(tick)).await.is_err() {
                                return FeedError::Stopped;
                            }
                        }
                    }
                    Err(e) => debug!("[FEED] {} unparseable frame: {}", settings.venue, e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return FeedError::Transport("connection closed by peer".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return e.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_venue_exhausts_bounded_attempts() {
        let (tx, mut rx) = mpsc::channel(64);
        let settings = StreamSettings::new(
            VenueId::Binance,
            vec!["BTC".into()],
            ReconnectPolicy::new(Duration::from_millis(5), 2),
        )
        .with_url("ws://127.0.0.1:1")
        .with_connect_timeout(Duration::from_millis(500));

        let stream = WsVenueStream::spawn(settings, tx);

        let mut connecting = 0;
        let mut exhausted = 0;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::StateChanged {
                    state: ConnectionState::Connecting,
                    ..
                } => connecting += 1,
                StreamEvent::Exhausted { attempts, .. } => {
                    assert_eq!(attempts, 2);
                    exhausted += 1;
                }
                _ => {}
            }
        }

        // Initial connect plus two reconnects; the channel closes when the task ends
        assert_eq!(connecting, 3);
        assert_eq!(exhausted, 1);
        stream.shutdown().await;
    }
}
