use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two independent traversal orders over a place's reviews.
///
/// Both directions walk the same underlying record set, so they eventually
/// start returning records the other direction has already produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    HighestRated,
    LowestRated,
}

impl SortDirection {
    pub const ALL: [SortDirection; 2] = [SortDirection::HighestRated, SortDirection::LowestRated];

    /// Sort code expected by the listugcposts endpoint.
    pub fn sort_code(&self) -> &'static str {
        match self {
            SortDirection::HighestRated => "1e3",
            SortDirection::LowestRated => "1e4",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::HighestRated => write!(f, "highest"),
            SortDirection::LowestRated => write!(f, "lowest"),
        }
    }
}
