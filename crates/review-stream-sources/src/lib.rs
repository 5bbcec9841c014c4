pub mod error;
pub mod maps;
pub mod traits;

pub use error::TransportError;
pub use maps::{MapsTransport, PlaceId};
pub use traits::PageTransport;
