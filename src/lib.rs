pub mod config;
pub mod device;
pub mod gate;
pub mod palette;
pub mod session;
pub mod telemetry;
pub mod transport;
