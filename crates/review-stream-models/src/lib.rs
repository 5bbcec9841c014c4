pub mod direction;
pub mod review;

pub use direction::SortDirection;
pub use review::{Review, Stars};
