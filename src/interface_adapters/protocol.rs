// Wire protocol DTOs and conversions for the race room WebSocket.
// Numbers are decoded leniently: anything non-numeric becomes `None`.

use crate::domain::{EntitySnapshot, InputSnapshot, Pose};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Entity fields the netcode does not interpret (name, lap, color, ...).
pub type Payload = serde_json::Map<String, Value>;

/// Messages the server sends over the room socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    // Identity of the locally controlled car.
    Welcome(WelcomeDto),
    // Authoritative snapshot of every car in the room.
    State(StateDto),
    // Reply to a latency probe.
    Pong(PongDto),
    Error(ErrorDto),
    // Room chat, lobby updates and anything else the netcode ignores.
    #[serde(other)]
    Other,
}

/// Messages the client sends over the room socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        input: InputDto,
    },
    Ping {
        #[serde(rename = "clientTime")]
        client_time: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct WelcomeDto {
    #[serde(rename = "playerId", default, deserialize_with = "lenient_id")]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateDto {
    /// Authoritative time in seconds.
    #[serde(rename = "serverTime", default, deserialize_with = "lenient_f64")]
    pub server_time: Option<f64>,
    #[serde(default)]
    pub players: Vec<PlayerStateDto>,
}

/// One car as listed in a `state` message.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStateDto {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: Option<f64>,
    #[serde(rename = "rotationDeg", default, deserialize_with = "lenient_f64")]
    pub rotation_deg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vx: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vy: Option<f64>,
    #[serde(flatten)]
    pub extra: Payload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PongDto {
    /// Echo of the probe's local send time, in milliseconds.
    #[serde(rename = "clientTime", default, deserialize_with = "lenient_f64")]
    pub client_time: Option<f64>,
    /// Authoritative time in seconds.
    #[serde(rename = "serverTime", default, deserialize_with = "lenient_f64")]
    pub server_time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDto {
    #[serde(default)]
    pub message: Option<String>,
}

/// Outbound input payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputDto {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub handbrake: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl From<InputSnapshot> for InputDto {
    fn from(input: InputSnapshot) -> Self {
        Self {
            throttle: input.throttle,
            brake: input.brake,
            steer: input.steer,
            handbrake: input.handbrake,
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
        }
    }
}

impl From<InputSnapshot> for ClientMessage {
    fn from(input: InputSnapshot) -> Self {
        ClientMessage::Input {
            input: input.into(),
        }
    }
}

impl PlayerStateDto {
    /// `None` for records without an id. A record whose position is not
    /// numeric keeps its id but carries no pose.
    pub fn into_snapshot(self) -> Option<EntitySnapshot<Payload>> {
        let id = self.id?;
        let pose = match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Pose::new(x, y, self.rotation_deg.unwrap_or(0.0))),
            _ => None,
        };
        Some(EntitySnapshot {
            id,
            pose,
            vx: self.vx,
            vy: self.vy,
            payload: self.extra,
        })
    }
}

impl StateDto {
    pub fn into_batch(self) -> Vec<EntitySnapshot<Payload>> {
        self.players
            .into_iter()
            .filter_map(PlayerStateDto::into_snapshot)
            .collect()
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite()))
}

// Ids are strings on the wire but numeric ids are accepted too.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}
