// fleetview-api: Async HTTP client for the fleet status feeds (node list, status table, detail pages)

pub mod client;
pub mod error;
pub mod html;
pub mod models;
pub mod transport;

pub use client::FeedClient;
pub use error::Error;
pub use models::{RawChart, RawDetail, RawNode, RawStatusRow};
pub use transport::TransportConfig;
