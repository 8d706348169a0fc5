mod bookkeeping;
mod forecast;
mod logistics;
mod ship;

pub use bookkeeping::BookkeepingSystem;
pub use forecast::ForecastSystem;
pub use logistics::LogisticsSystem;
pub use ship::{port_call_decision, PortCall, ShipSystem};
