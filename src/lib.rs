//! Countdown tracking library
//!
//! This library stores named events with a target date in device-local
//! storage and derives live countdowns (days, hours, minutes, seconds) to
//! each of them.

mod cli;
mod clock;
mod config;
mod countdown;
mod errors;
mod event;
mod helper;
mod persistence;
mod service;
mod storage;
mod store;
mod subscription;
mod ticker;
mod types;

// Re-export key components
pub use cli::*;
pub use clock::*;
pub use config::*;
pub use countdown::*;
pub use errors::*;
pub use event::*;
pub use helper::*;
pub use persistence::*;
pub use service::*;
pub use storage::*;
pub use store::*;
pub use subscription::*;
pub use ticker::*;
pub use types::*;
