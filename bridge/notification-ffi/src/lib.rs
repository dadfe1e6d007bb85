//! Host entry points of the notification service.
//!
//! The mobile app's background execution (Android foreground service, iOS
//! notification service extension) initializes the service once, then hands
//! over each push message and keeps running until the returned future
//! resolves.
mod ffi;
pub mod logging;

// nosemgrep: ban-wildcard-imports
pub use ffi::*;
