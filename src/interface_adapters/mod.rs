// Interface adapters: wire protocol, WebSocket transport and host clock.

pub mod net;
pub mod protocol;
pub mod utils;
