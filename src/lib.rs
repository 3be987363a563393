//! Playlist ingestion and channel availability core for an IPTV channel
//! browser.
//!
//! The UI layer supplies enabled playlist sources and reads back parsed
//! channels, group structure, and per-channel reachability; playback and
//! presentation live entirely outside this crate.

pub mod error;
pub mod services;
pub mod state;

pub use error::{IptvError, Result};
pub use state::AppState;
