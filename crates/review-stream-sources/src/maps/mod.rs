pub mod api;
pub mod client;
pub mod place;

pub use client::MapsTransport;
pub use place::PlaceId;
