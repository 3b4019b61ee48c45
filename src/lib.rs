//! Durable vehicle identities and prohibited-turn counting on top of a
//! per-frame detector with its own short-lived track ids.

pub mod bbox;
pub mod config;
pub mod detection;
pub mod dump;
pub mod engine;
pub mod error;
pub mod filter;
pub mod frame;
pub mod geometry;
pub mod settings;
pub mod sink;
pub mod track;
pub mod tracker;
pub mod zone;

pub use config::ZoneConfig;
pub use detection::{Detection, VehicleDetection};
pub use error::Error;
pub use filter::{FilterConfig, TurnFilter};
pub use frame::Frame;
pub use track::{TrackId, VehicleTrack};
pub use zone::ZoneDefinition;
