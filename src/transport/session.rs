//! The session: a single WebSocket connection with request/response and
//! push-event primitives.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use super::{Frame, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bound on the TCP connect plus WebSocket handshake, applied to the
    /// initial connection and to every reconnection attempt. An endpoint
    /// that accepts the socket but never completes the handshake must not
    /// hang the run.
    pub connect_timeout: Duration,
    /// How many times to attempt reconnection after the link drops before
    /// the session is considered closed.
    pub reconnect_attempts: u32,
    /// Fixed backoff between reconnection attempts.
    pub reconnect_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            reconnect_attempts: 3,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

enum Outbound {
    Frame(String),
    Shutdown,
}

enum LinkExit {
    Shutdown,
    Dropped,
}

struct Shared {
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    push_waiters: Mutex<HashMap<String, VecDeque<oneshot::Sender<Value>>>>,
    closed: AtomicBool,
}

impl Shared {
    /// Fails every outstanding request by dropping its reply channel.
    /// In-flight requests on a dropped link can never be answered.
    async fn fail_pending(&self) {
        self.pending.lock().await.clear();
    }

    async fn fail_push_waiters(&self) {
        self.push_waiters.lock().await.clear();
    }
}

/// An authenticated-or-not, per-run connection to the monitoring service.
///
/// The session is exclusively owned by one run and never shared across
/// concurrent reconciliation tasks. `close` must run on every exit path; a
/// leaked open session is a defect, so dropping the session also tears the
/// connection down.
pub struct Session {
    outbound: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
    next_ack: AtomicU64,
    pump: JoinHandle<()>,
}

impl Session {
    /// Opens the transport. Does not imply authentication.
    ///
    /// Once established, the session attempts bounded reconnection with a
    /// fixed backoff if the link drops before [`Session::close`] is called.
    /// The initial connection failure is fatal and returned to the caller.
    pub async fn connect(url: &Url, options: SessionOptions) -> Result<Self, TransportError> {
        let (ws, _) = tokio::time::timeout(options.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout {
                event: "connect".to_string(),
                timeout: options.connect_timeout,
            })?
            .map_err(|source| TransportError::Connect { url: url.to_string(), source })?;
        tracing::debug!(url = %url, "Session connected");

        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            push_waiters: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let pump =
            tokio::spawn(run_pump(url.clone(), options, ws, outbound_rx, Arc::clone(&shared)));

        Ok(Self { outbound, shared, next_ack: AtomicU64::new(0), pump })
    }

    /// Sends a correlated request and waits for its reply, failing with
    /// [`TransportError::Timeout`] if no response arrives in time. There is
    /// no unbounded wait.
    pub async fn request(
        &self,
        event: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let ack = self.next_ack.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(ack, tx);

        let text = serde_json::to_string(&Frame::request(event, ack, data))?;
        if self.outbound.send(Outbound::Frame(text)).is_err() {
            self.shared.pending.lock().await.remove(&ack);
            return Err(TransportError::ConnectionClosed);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(_) => {
                self.shared.pending.lock().await.remove(&ack);
                Err(TransportError::Timeout { event: event.to_string(), timeout })
            }
        }
    }

    /// Registers interest in the next push carrying `event`.
    ///
    /// Must be called before the request that triggers the push, and at most
    /// one waiter is woken per push. The subscription resolves with the
    /// first matching push after registration; correlation is by order, so
    /// concurrent subscriptions for the same event must be serialized by the
    /// caller.
    pub async fn subscribe(&self, event: &str) -> PushSubscription {
        let (tx, rx) = oneshot::channel();
        self.shared
            .push_waiters
            .lock()
            .await
            .entry(event.to_string())
            .or_default()
            .push_back(tx);
        PushSubscription { event: event.to_string(), rx }
    }

    /// Releases the connection. Safe to call multiple times.
    pub async fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            let _ = self.outbound.send(Outbound::Shutdown);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.pump.abort();
    }
}

/// A registered wait for a single push message.
pub struct PushSubscription {
    event: String,
    rx: oneshot::Receiver<Value>,
}

impl PushSubscription {
    /// Waits for the push, bounded by `timeout`.
    pub async fn recv(self, timeout: Duration) -> Result<Value, TransportError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(_) => Err(TransportError::Timeout { event: self.event, timeout }),
        }
    }
}

async fn run_pump(
    url: Url,
    options: SessionOptions,
    mut ws: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
) {
    let mut attempts_left = options.reconnect_attempts;

    loop {
        let exit = pump_link(&mut ws, &mut outbound_rx, &shared).await;
        shared.fail_pending().await;

        match exit {
            LinkExit::Shutdown => {
                let _ = ws.close(None).await;
                shared.fail_push_waiters().await;
                tracing::debug!("Session closed");
                return;
            }
            LinkExit::Dropped => loop {
                if attempts_left == 0 {
                    tracing::warn!("Link dropped and reconnection attempts exhausted");
                    shared.closed.store(true, Ordering::SeqCst);
                    shared.fail_push_waiters().await;
                    return;
                }
                attempts_left -= 1;
                tokio::time::sleep(options.reconnect_delay).await;

                match tokio::time::timeout(options.connect_timeout, connect_async(url.as_str()))
                    .await
                {
                    Ok(Ok((stream, _))) => {
                        tracing::info!(url = %url, "Session reconnected");
                        ws = stream;
                        break;
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(%error, attempts_left, "Reconnection attempt failed");
                    }
                    Err(_) => {
                        tracing::warn!(attempts_left, "Reconnection handshake timed out");
                    }
                }
            },
        }
    }
}

async fn pump_link(
    ws: &mut WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    shared: &Shared,
) -> LinkExit {
    loop {
        tokio::select! {
            out = outbound_rx.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    if ws.send(Message::text(text)).await.is_err() {
                        return LinkExit::Dropped;
                    }
                }
                Some(Outbound::Shutdown) | None => return LinkExit::Shutdown,
            },
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_frame(shared, text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => return LinkExit::Dropped,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(%error, "WebSocket read failed");
                    return LinkExit::Dropped;
                }
            },
        }
    }
}

async fn handle_frame(shared: &Shared, text: &str) {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::warn!(%error, "Discarding undecodable frame");
            return;
        }
    };

    match frame.ack {
        Some(ack) => {
            if let Some(tx) = shared.pending.lock().await.remove(&ack) {
                let _ = tx.send(frame.data);
            } else {
                tracing::debug!(ack, event = %frame.event, "Reply with no outstanding request");
            }
        }
        None => {
            let mut waiters = shared.push_waiters.lock().await;
            let queue = waiters.entry(frame.event.clone()).or_default();
            let mut payload = frame.data;
            // A waiter whose receiver was dropped (e.g. it timed out) passes
            // the push on to the next one in line.
            let delivered = loop {
                let Some(tx) = queue.pop_front() else { break false };
                match tx.send(payload) {
                    Ok(()) => break true,
                    Err(returned) => payload = returned,
                }
            };
            if !delivered {
                tracing::debug!(event = %frame.event, "Unclaimed push discarded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;

    async fn read_frame(ws: &mut WebSocketStream<TcpStream>) -> Option<Frame> {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).ok();
            }
        }
        None
    }

    async fn send_frame(ws: &mut WebSocketStream<TcpStream>, frame: &Frame) {
        let text = serde_json::to_string(frame).unwrap();
        ws.send(Message::text(text)).await.unwrap();
    }

    /// Binds a one-connection WebSocket server and hands the stream to the
    /// given handler.
    async fn spawn_server<F, Fut>(handler: F) -> Url
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let ws = accept_async(stream).await.unwrap();
                handler(ws).await;
            }
        });
        Url::parse(&format!("ws://{addr}")).unwrap()
    }

    #[tokio::test]
    async fn request_receives_correlated_reply() {
        let url = spawn_server(|mut ws| async move {
            let frame = read_frame(&mut ws).await.unwrap();
            assert_eq!(frame.event, "login");
            let reply = Frame { event: "login".into(), ack: frame.ack, data: json!({"ok": true}) };
            send_frame(&mut ws, &reply).await;
        })
        .await;

        let session = Session::connect(&url, SessionOptions::default()).await.unwrap();
        let reply = session
            .request("login", json!({"username": "admin"}), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(reply["ok"], true);
        session.close().await;
    }

    #[tokio::test]
    async fn request_times_out_when_no_reply_arrives() {
        let url = spawn_server(|mut ws| async move {
            // Read the request and never answer it.
            let _ = read_frame(&mut ws).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;

        let session = Session::connect(&url, SessionOptions::default()).await.unwrap();
        let result = session.request("add", json!({}), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        session.close().await;
    }

    #[tokio::test]
    async fn first_matching_push_resolves_subscription() {
        let url = spawn_server(|mut ws| async move {
            let frame = read_frame(&mut ws).await.unwrap();
            assert_eq!(frame.event, "getMonitorList");
            let reply = Frame { event: frame.event, ack: frame.ack, data: json!({"ok": true}) };
            send_frame(&mut ws, &reply).await;
            let push = Frame {
                event: "monitorList".into(),
                ack: None,
                data: json!({"1": {"name": "SSL abemon.es"}}),
            };
            send_frame(&mut ws, &push).await;
        })
        .await;

        let session = Session::connect(&url, SessionOptions::default()).await.unwrap();
        let subscription = session.subscribe("monitorList").await;
        session.request("getMonitorList", json!({}), Duration::from_secs(2)).await.unwrap();
        let push = subscription.recv(Duration::from_secs(2)).await.unwrap();
        assert_eq!(push["1"]["name"], "SSL abemon.es");
        session.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fails_later_requests() {
        let url = spawn_server(|mut ws| async move {
            while ws.next().await.is_some() {}
        })
        .await;

        let session = Session::connect(&url, SessionOptions::default()).await.unwrap();
        session.close().await;
        session.close().await;

        let result = session.request("add", json!({}), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn connect_is_bounded_against_a_silent_endpoint() {
        // Accepts the TCP connection but never answers the WebSocket
        // handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let url = Url::parse(&format!("ws://{addr}")).unwrap();
        let options = SessionOptions {
            connect_timeout: Duration::from_millis(100),
            ..SessionOptions::default()
        };
        let result = Session::connect(&url, options).await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        // Nothing listens on this port.
        let url = Url::parse("ws://127.0.0.1:1").unwrap();
        let result = Session::connect(&url, SessionOptions::default()).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
