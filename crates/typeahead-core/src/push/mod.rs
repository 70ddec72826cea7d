//! WebSocket push channel
//!
//! A side channel for server-originated suggestions, context merges,
//! cache pre-warming, and provider status. The socket lives in one
//! supervisor task: connect, pump frames, and on close reconnect after a
//! fixed backoff. Nothing from a dead socket leaks into the next one:
//! the old sink and stream are dropped before a reconnect starts, and
//! each connection bumps a generation counter.
//!
//! Push failures never fail a pending HTTP request; HTTP remains the
//! source of truth and everything delivered here is advisory.

pub mod messages;

pub use messages::{ClientMessage, PushMessage};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use typeahead_cache::FifoCache;

use crate::bus::{EngineEvent, EventBus};
use crate::context::ContextStore;
use crate::types::{AppContext, CompletionResponse};

/// Socket lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Collaborators the channel dispatches into
pub(crate) struct PushDeps {
    pub cache: Arc<FifoCache<CompletionResponse>>,
    pub context: Arc<ContextStore>,
    pub bus: EventBus,
    pub app_context: AppContext,
}

/// Handle to the running push channel
///
/// Dropping the handle shuts the supervisor task down.
pub struct PushChannel {
    state: Arc<Mutex<ChannelState>>,
    generation: Arc<AtomicU64>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    session_id: String,
    app_context: AppContext,
}

impl PushChannel {
    /// Spawn the supervisor task and return the handle
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        url: String,
        reconnect_backoff: Duration,
        session_id: String,
        deps: PushDeps,
    ) -> Self {
        let state = Arc::new(Mutex::new(ChannelState::Disconnected));
        let generation = Arc::new(AtomicU64::new(0));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let app_context = deps.app_context;

        tokio::spawn(supervise(
            url,
            reconnect_backoff,
            Arc::clone(&state),
            Arc::clone(&generation),
            outbound_rx,
            shutdown_rx,
            deps,
        ));

        Self {
            state,
            generation,
            outbound,
            shutdown,
            session_id,
            app_context,
        }
    }

    /// Current socket state
    pub fn state(&self) -> ChannelState {
        *self.state.lock().expect("push state lock poisoned")
    }

    /// Connection generation; bumps on every (re)connect attempt
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Report a page-visibility change
    ///
    /// Hidden sends `pause`, visible sends `resume`. The socket is never
    /// torn down here; the server just stops pushing while paused. With
    /// no live socket there is nothing to tell, so the frame is dropped.
    pub fn set_visible(&self, visible: bool) {
        if self.state() != ChannelState::Connected {
            debug!("visibility change with no live socket, dropping");
            return;
        }

        let message = if visible {
            ClientMessage::Resume {
                session_id: self.session_id.clone(),
                app_context: Some(self.app_context),
            }
        } else {
            ClientMessage::Pause {
                session_id: self.session_id.clone(),
                app_context: Some(self.app_context),
            }
        };
        let _ = self.outbound.send(message);
    }

    /// Close the socket and stop reconnecting
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn supervise(
    url: String,
    reconnect_backoff: Duration,
    state: Arc<Mutex<ChannelState>>,
    generation: Arc<AtomicU64>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
    deps: PushDeps,
) {
    'supervisor: loop {
        if *shutdown_rx.borrow() {
            break;
        }

        set_state(&state, ChannelState::Connecting);
        generation.fetch_add(1, Ordering::SeqCst);

        let connection = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown_rx.changed() => break 'supervisor,
        };

        match connection {
            Ok((socket, _)) => {
                set_state(&state, ChannelState::Connected);
                deps.bus.publish(EngineEvent::SocketConnected);
                let (mut sink, mut stream) = socket.split();

                loop {
                    tokio::select! {
                        frame = stream.next() => match frame {
                            Some(Ok(Message::Text(text))) => dispatch(&text, &deps),
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                deps.bus.publish(EngineEvent::SocketError {
                                    message: e.to_string(),
                                });
                                break;
                            }
                        },
                        Some(message) = outbound_rx.recv() => {
                            match serde_json::to_string(&message) {
                                Ok(text) => {
                                    if let Err(e) = sink.send(Message::Text(text)).await {
                                        deps.bus.publish(EngineEvent::SocketError {
                                            message: e.to_string(),
                                        });
                                        break;
                                    }
                                }
                                Err(e) => warn!("failed to encode client frame: {e}"),
                            }
                        },
                        _ = shutdown_rx.changed() => {
                            set_state(&state, ChannelState::Closing);
                            let _ = sink.send(Message::Close(None)).await;
                            deps.bus.publish(EngineEvent::SocketDisconnected);
                            set_state(&state, ChannelState::Disconnected);
                            break 'supervisor;
                        }
                    }
                }

                // Old sink/stream drop here; a reconnect starts clean
                deps.bus.publish(EngineEvent::SocketDisconnected);
            }
            Err(e) => {
                deps.bus.publish(EngineEvent::SocketError {
                    message: e.to_string(),
                });
            }
        }

        set_state(&state, ChannelState::Disconnected);

        tokio::select! {
            _ = tokio::time::sleep(reconnect_backoff) => {}
            _ = shutdown_rx.changed() => break 'supervisor,
        }
    }

    set_state(&state, ChannelState::Disconnected);
}

fn set_state(state: &Arc<Mutex<ChannelState>>, next: ChannelState) {
    *state.lock().expect("push state lock poisoned") = next;
}

fn dispatch(text: &str, deps: &PushDeps) {
    let message: PushMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("dropping unrecognised push frame: {e}");
            return;
        }
    };

    match message {
        PushMessage::CompletionSuggestion { query, completions } => {
            deps.bus.publish(EngineEvent::Suggestion {
                query,
                items: completions,
            });
        }
        PushMessage::ContextUpdate { updates } => {
            deps.context.update(updates);
        }
        PushMessage::CacheUpdate { key, value } => {
            match serde_json::from_value::<CompletionResponse>(value) {
                Ok(response) => deps.cache.put(&key, response),
                Err(e) => debug!("dropping cache_update with undecodable value: {e}"),
            }
        }
        PushMessage::ProviderStatus { provider, status } => {
            deps.bus.publish(EngineEvent::ProviderStatus { provider, status });
        }
        PushMessage::ProductRecommendation { products } => {
            if deps.app_context == AppContext::Storefront {
                deps.bus
                    .publish(EngineEvent::ProductRecommendation { items: products });
            } else {
                debug!("dropping product_recommendation outside storefront");
            }
        }
        PushMessage::SearchSuggestion { suggestions } => {
            if deps.app_context == AppContext::Storefront {
                deps.bus
                    .publish(EngineEvent::SearchSuggestion { suggestions });
            } else {
                debug!("dropping search_suggestion outside storefront");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextDelta;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use typeahead_cache::CacheConfig;
    use typeahead_common::JsonStore;

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixture {
        cache: Arc<FifoCache<CompletionResponse>>,
        context: Arc<ContextStore>,
        bus: EventBus,
        _dir: tempfile::TempDir,
    }

    fn fixture(app_context: AppContext) -> Fixture {
        let dir = tempdir().unwrap();
        let bus = EventBus::new();
        let context = Arc::new(ContextStore::load(
            app_context,
            None,
            JsonStore::new(dir.path()),
            bus.clone(),
        ));
        Fixture {
            cache: Arc::new(FifoCache::new(CacheConfig::default())),
            context,
            bus,
            _dir: dir,
        }
    }

    fn deps(fixture: &Fixture, app_context: AppContext) -> PushDeps {
        PushDeps {
            cache: Arc::clone(&fixture.cache),
            context: Arc::clone(&fixture.context),
            bus: fixture.bus.clone(),
            app_context,
        }
    }

    /// Test server: pushes `frames_to_send` to every connection, then
    /// forwards client text frames on the returned channel (or closes
    /// straight away when `close_after_send` is set).
    async fn ws_server(
        frames_to_send: Vec<String>,
        close_after_send: bool,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
                for frame in &frames_to_send {
                    socket.send(Message::Text(frame.clone())).await.unwrap();
                }
                if close_after_send {
                    let _ = socket.close(None).await;
                    continue;
                }
                while let Some(Ok(frame)) = socket.next().await {
                    if let Message::Text(text) = frame {
                        let _ = received_tx.send(text);
                    }
                }
            }
        });

        (format!("ws://{addr}"), received_rx)
    }

    async fn wait_for_event<F>(
        subscriber: &mut tokio::sync::broadcast::Receiver<EngineEvent>,
        mut matches: F,
    ) -> EngineEvent
    where
        F: FnMut(&EngineEvent) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let event = subscriber.recv().await.unwrap();
                if matches(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event did not arrive in time")
    }

    #[tokio::test]
    async fn test_connect_emits_connected_event() {
        let fixture = fixture(AppContext::Dashboard);
        let mut subscriber = fixture.bus.subscribe();
        let (url, _rx) = ws_server(vec![], false).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(100),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );

        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketConnected)
        })
        .await;
        assert_eq!(channel.state(), ChannelState::Connected);
        assert_eq!(channel.generation(), 1);

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_cache_update_frame_populates_cache() {
        let fixture = fixture(AppContext::Dashboard);
        let frame = json!({
            "type": "cache_update",
            "key": "fp-abc",
            "value": {"completions": [{"text": "pushed"}], "provider_used": "push"}
        })
        .to_string();
        let (url, _rx) = ws_server(vec![frame], false).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(100),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );

        timeout(WAIT, async {
            loop {
                if fixture.cache.get("fp-abc").is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("cache_update was not applied");

        let cached = fixture.cache.get("fp-abc").unwrap();
        assert_eq!(cached.completions[0].text, "pushed");

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_context_update_frame_merges_context() {
        let fixture = fixture(AppContext::Dashboard);
        let frame = json!({
            "type": "context_update",
            "updates": {"current_page": "/from-server"}
        })
        .to_string();
        let (url, _rx) = ws_server(vec![frame], false).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(100),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );

        timeout(WAIT, async {
            loop {
                if fixture.context.snapshot().current_page == "/from-server" {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("context_update was not applied");

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_visibility_toggle_sends_pause_then_resume() {
        let fixture = fixture(AppContext::Storefront);
        let mut subscriber = fixture.bus.subscribe();
        let (url, mut received) = ws_server(vec![], false).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(100),
            "s-42".to_string(),
            deps(&fixture, AppContext::Storefront),
        );
        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketConnected)
        })
        .await;

        channel.set_visible(false);
        channel.set_visible(true);

        let pause: serde_json::Value =
            serde_json::from_str(&timeout(WAIT, received.recv()).await.unwrap().unwrap()).unwrap();
        assert_eq!(pause["type"], json!("pause"));
        assert_eq!(pause["session_id"], json!("s-42"));

        let resume: serde_json::Value =
            serde_json::from_str(&timeout(WAIT, received.recv()).await.unwrap().unwrap()).unwrap();
        assert_eq!(resume["type"], json!("resume"));

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_server_close_triggers_reconnect() {
        let fixture = fixture(AppContext::Dashboard);
        let mut subscriber = fixture.bus.subscribe();
        // Server closes every connection immediately after accepting
        let (url, _rx) = ws_server(vec![], true).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(50),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );

        // First connect, disconnect, then a second connect after backoff
        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketConnected)
        })
        .await;
        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketDisconnected)
        })
        .await;
        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketConnected)
        })
        .await;
        assert!(channel.generation() >= 2);

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_are_dropped() {
        let fixture = fixture(AppContext::Dashboard);
        let frames = vec![
            "not json at all".to_string(),
            json!({"type": "mystery"}).to_string(),
            // Storefront-only frame must be ignored on the dashboard
            json!({"type": "search_suggestion", "suggestions": ["x"]}).to_string(),
            json!({"type": "provider_status", "provider": "ai", "status": "degraded"}).to_string(),
        ];
        let mut subscriber = fixture.bus.subscribe();
        let (url, _rx) = ws_server(frames, false).await;

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(100),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );

        // The provider_status frame arrives last; everything before it was
        // dropped without killing the channel
        let event = wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::ProviderStatus { .. })
        })
        .await;
        match event {
            EngineEvent::ProviderStatus { provider, status } => {
                assert_eq!(provider, "ai");
                assert_eq!(status, "degraded");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(channel.state(), ChannelState::Connected);

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_stops_reconnecting() {
        let fixture = fixture(AppContext::Dashboard);
        let (url, _rx) = ws_server(vec![], false).await;
        let mut subscriber = fixture.bus.subscribe();

        let channel = PushChannel::spawn(
            url,
            Duration::from_millis(50),
            "s-1".to_string(),
            deps(&fixture, AppContext::Dashboard),
        );
        wait_for_event(&mut subscriber, |e| {
            matches!(e, EngineEvent::SocketConnected)
        })
        .await;

        let generation = channel.generation();
        channel.shutdown();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert_eq!(channel.generation(), generation);
    }

    #[test]
    fn test_context_delta_default_is_empty() {
        // Guards the serde(default) on ContextUpdate frames
        let delta = ContextDelta::default();
        assert!(delta.current_page.is_none());
        assert!(delta.extensions.is_empty());
    }
}
