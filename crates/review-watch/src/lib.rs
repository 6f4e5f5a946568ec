//! Homework review watcher.
//!
//! Polls the review API on a fixed interval, detects review status changes
//! for each homework, and relays a message to a single Telegram chat.
//!
//! # Modules
//!
//! - [`poller`]: authenticated client for the status endpoint
//! - [`validator`]: response shape checks and cursor extraction
//! - [`status`]: status codes and the catalog of chat texts
//! - [`detector`]: per-homework duplicate suppression
//! - [`watcher`]: the loop driver tying them together
//! - [`config`]: environment configuration

pub mod config;
pub mod detector;
pub mod error;
pub mod poller;
pub mod status;
pub mod validator;
pub mod watcher;

pub use config::Config;
pub use detector::ChangeDetector;
pub use error::WatchError;
pub use poller::ReviewClient;
pub use status::{ReviewStatus, StatusCatalog, StatusUpdate};
pub use watcher::{CycleReport, Watcher};
