// Shared helpers for integration tests: a hand-driven clock and a local
// WebSocket endpoint bound to an ephemeral port.
#![allow(dead_code)]

use race_netcode::Frame;
use race_netcode::domain::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

// Clock the test advances explicitly; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn set(&self, ms: f64) {
        *self.now_ms.lock().expect("clock mutex") = ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now_ms.lock().expect("clock mutex")
    }
}

// Bind to an ephemeral port to avoid collisions with local services.
pub async fn bind_local() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    (listener, format!("ws://{addr}"))
}

// Wait until a published frame satisfies `pred`, or panic after `limit`.
pub async fn wait_for_frame(
    frames_rx: &mut watch::Receiver<Frame>,
    limit: Duration,
    pred: impl Fn(&Frame) -> bool,
) -> Frame {
    tokio::time::timeout(limit, async {
        loop {
            {
                let frame = frames_rx.borrow_and_update();
                if pred(&frame) {
                    return frame.clone();
                }
            }
            frames_rx.changed().await.expect("frames channel open");
        }
    })
    .await
    .expect("frame condition should be reached in time")
}
