pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::client::{ClientHandle, run_with_config, spawn};
pub use interface_adapters::net::{DeviceEvent, Frame, NetError};
pub use use_cases::NetSession;
