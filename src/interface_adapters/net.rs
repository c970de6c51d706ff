// WebSocket transport for one race room connection.
// Owns framing and connection lifecycle; every netcode decision goes through
// `NetSession`.

use crate::domain::{Clock, InputSnapshot, Pose};
use crate::interface_adapters::protocol::{ClientMessage, Payload, ServerMessage};
use crate::use_cases::{AnalogState, GamepadReading, Key, NetSession, RenderedEntity};

use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug)]
pub enum NetError {
    Connect(tungstenite::Error),
    Ws(tungstenite::Error),
    Serialization(serde_json::Error),
    InvalidUrl(String),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Connect(err) => write!(f, "failed to connect: {err}"),
            NetError::Ws(err) => write!(f, "websocket error: {err}"),
            NetError::Serialization(err) => write!(f, "failed to encode message: {err}"),
            NetError::InvalidUrl(reason) => write!(f, "invalid server url: {reason}"),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::Connect(err) | NetError::Ws(err) => Some(err),
            NetError::Serialization(err) => Some(err),
            NetError::InvalidUrl(_) => None,
        }
    }
}

impl From<tungstenite::Error> for NetError {
    fn from(err: tungstenite::Error) -> Self {
        NetError::Ws(err)
    }
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::Serialization(err)
    }
}

impl From<url::ParseError> for NetError {
    fn from(err: url::ParseError) -> Self {
        NetError::InvalidUrl(err.to_string())
    }
}

/// Host-side events fed into the connection loop.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Key { key: Key, pressed: bool },
    Analog(AnalogState),
    Gamepad(Option<GamepadReading>),
    LocalPrediction(Option<Pose>),
}

/// Rendered state published once per frame tick.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub rendered_at_ms: f64,
    pub local_player_id: Option<String>,
    pub entities: Vec<RenderedEntity<Payload>>,
}

/// Timer cadences for the connection loop.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub input: Duration,
    pub probe: Duration,
    pub frame: Duration,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Room endpoint `<base>/ws/<room>/<name>`. `http(s)` bases map to `ws(s)`.
pub fn room_url(base: &str, room: &str, player_name: &str) -> Result<Url, NetError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(NetError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| NetError::InvalidUrl(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| NetError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["ws", room, player_name]);
    Ok(url)
}

/// Connects to `url` and drives `session` until either side closes.
///
/// Session state is reset when the connection opens and cleared when it
/// ends, whatever the outcome. An empty frame is published on teardown.
pub async fn run_room_connection<C: Clock>(
    url: &Url,
    session: &mut NetSession<C, Payload>,
    events_rx: &mut mpsc::Receiver<DeviceEvent>,
    frames_tx: &watch::Sender<Frame>,
    cadence: Cadence,
) -> Result<(), NetError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(NetError::Connect)?;
    info!(%url, "connected to race room");

    let (mut sink, mut stream) = socket.split();
    session.on_connected();

    let mut input_timer = tokio::time::interval(cadence.input);
    let mut probe_timer = tokio::time::interval(cadence.probe);
    let mut frame_timer = tokio::time::interval(cadence.frame);
    for timer in [&mut input_timer, &mut probe_timer, &mut frame_timer] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }

    let mut invalid_log = InvalidMessageLog::default();

    let result = loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_server_text(session, text.as_str(), &mut invalid_log);
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "server closed the connection");
                    break Ok(());
                }
                // Binary frames carry nothing for the netcode; ping/pong is
                // answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(err)) => break Err(NetError::Ws(err)),
                None => break Ok(()),
            },

            _ = input_timer.tick() => {
                if let Some(input) = session.input_tick() {
                    if let Err(err) = send_message(&mut sink, &input.into()).await {
                        break Err(err);
                    }
                }
            }

            _ = probe_timer.tick() => {
                let client_time = session.probe_client_time();
                if let Err(err) = send_message(&mut sink, &ClientMessage::Ping { client_time }).await {
                    break Err(err);
                }
            }

            _ = frame_timer.tick() => {
                let now = session.now_ms();
                frames_tx.send_replace(Frame {
                    rendered_at_ms: now,
                    local_player_id: session.local_player_id().map(str::to_string),
                    entities: session.tick(now),
                });
            }

            event = events_rx.recv() => match event {
                Some(event) => {
                    if let Some(input) = apply_device_event(session, event) {
                        if let Err(err) = send_message(&mut sink, &input.into()).await {
                            break Err(err);
                        }
                    }
                }
                None => {
                    info!("device channel closed; leaving room");
                    if let Err(err) = sink.close().await {
                        debug!(error = %err, "socket close error");
                    }
                    break Ok(());
                }
            },
        }
    };

    session.on_disconnected();
    frames_tx.send_replace(Frame::default());
    if let Err(err) = &result {
        warn!(error = %err, "race room connection ended with error");
    }
    result
}

fn handle_server_text<C: Clock>(
    session: &mut NetSession<C, Payload>,
    text: &str,
    invalid_log: &mut InvalidMessageLog,
) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Welcome(welcome)) => match welcome.player_id {
            Some(player_id) => session.set_local_player(player_id),
            None => warn!("welcome without player id"),
        },
        Ok(ServerMessage::State(state)) => {
            let server_time = state.server_time;
            session.ingest_snapshot(state.into_batch(), server_time);
        }
        Ok(ServerMessage::Pong(pong)) => session.handle_pong(pong.client_time, pong.server_time),
        Ok(ServerMessage::Error(err)) => {
            warn!(reason = err.message.as_deref().unwrap_or_default(), "server reported error");
        }
        Ok(ServerMessage::Other) => {}
        Err(err) => {
            if let Some(suppressed) = invalid_log.admit(Instant::now()) {
                warn!(error = %err, bytes = text.len(), suppressed, "invalid server message");
            }
        }
    }
}

fn apply_device_event<C: Clock>(
    session: &mut NetSession<C, Payload>,
    event: DeviceEvent,
) -> Option<InputSnapshot> {
    match event {
        DeviceEvent::Key { key, pressed } => session.apply_key(key, pressed),
        DeviceEvent::Analog(analog) => session.set_analog(analog),
        DeviceEvent::Gamepad(reading) => session.update_gamepad(reading.as_ref()),
        DeviceEvent::LocalPrediction(pose) => {
            session.set_local_prediction(pose);
            None
        }
    }
}

async fn send_message<S>(sink: &mut S, msg: &ClientMessage) -> Result<(), NetError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let txt = serde_json::to_string(msg)?;
    sink.send(Message::Text(txt.into())).await?;
    Ok(())
}

/// Rate limit for undecodable room messages. Counts what it drops.
#[derive(Debug, Default)]
struct InvalidMessageLog {
    last_warned: Option<Instant>,
    suppressed: u64,
}

impl InvalidMessageLog {
    /// `Some(n)` when a warning is due, `n` being the messages dropped since
    /// the previous one.
    fn admit(&mut self, now: Instant) -> Option<u64> {
        match self.last_warned {
            Some(last) if now.saturating_duration_since(last) < LOG_THROTTLE => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_warned = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NetTuning;
    use crate::interface_adapters::utils::clock::MonotonicClock;

    fn session() -> NetSession<MonotonicClock, Payload> {
        NetSession::new(MonotonicClock::new(), NetTuning::default())
    }

    #[test]
    fn invalid_message_log_warns_once_per_window_and_counts_drops() {
        let mut log = InvalidMessageLog::default();
        let start = Instant::now();

        assert_eq!(log.admit(start), Some(0));
        assert_eq!(log.admit(start + Duration::from_millis(10)), None);
        assert_eq!(log.admit(start + Duration::from_millis(1_500)), None);
        assert_eq!(log.admit(start + LOG_THROTTLE), Some(2));
        assert_eq!(log.admit(start + LOG_THROTTLE), None);
    }

    #[test]
    fn server_error_message_leaves_session_untouched() {
        let mut session = session();
        let mut log = InvalidMessageLog::default();

        handle_server_text(&mut session, r#"{"type":"welcome","playerId":"me"}"#, &mut log);
        handle_server_text(
            &mut session,
            r#"{"type":"error","message":"room is full"}"#,
            &mut log,
        );
        handle_server_text(&mut session, r#"{"type":"error"}"#, &mut log);

        assert_eq!(session.local_player_id(), Some("me"));
        assert_eq!(session.entity_count(), 0);
        assert_eq!(log.suppressed, 0);
        assert!(log.last_warned.is_none());
    }

    #[test]
    fn undecodable_text_goes_through_the_rate_limit() {
        let mut session = session();
        let mut log = InvalidMessageLog::default();

        handle_server_text(&mut session, "not json", &mut log);
        handle_server_text(&mut session, r#"{"type":"state","players":7}"#, &mut log);

        assert!(log.last_warned.is_some());
        assert_eq!(log.suppressed, 1);
        assert_eq!(session.entity_count(), 0);
    }

    #[test]
    fn room_url_appends_encoded_segments() {
        let url = room_url("ws://127.0.0.1:8000", "brands public", "Ana").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8000/ws/brands%20public/Ana");
    }

    #[test]
    fn room_url_maps_http_and_keeps_base_path() {
        let url = room_url("https://race.example/game/", "r1", "p").unwrap();
        assert_eq!(url.as_str(), "wss://race.example/game/ws/r1/p");
    }

    #[test]
    fn room_url_rejects_other_schemes() {
        assert!(matches!(
            room_url("ftp://race.example", "r", "p"),
            Err(NetError::InvalidUrl(_))
        ));
        assert!(matches!(
            room_url("not a url", "r", "p"),
            Err(NetError::InvalidUrl(_))
        ));
    }
}
