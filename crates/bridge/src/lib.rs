//! Runs notification jobs inside a short-lived background execution window.
pub use connection::ConnectionGuard;
pub use controller::{ServiceController, ServiceDeps};
pub use exit::ExitSignal;
pub use router::EventRouter;

pub mod connection;
pub mod controller;
pub mod exit;
pub mod router;
pub mod timer;
