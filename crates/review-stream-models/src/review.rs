use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Star rating attached to a review.
///
/// The wire payload does not reliably carry a rating for every record, so
/// "unknown" is a first-class value rather than an error. A known rating is
/// always in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stars {
    Rated(u8),
    Unknown,
}

impl Stars {
    /// Accepts only the valid 1-5 range; anything else maps to `Unknown`.
    pub fn from_raw(n: i64) -> Self {
        if (1..=5).contains(&n) {
            Stars::Rated(n as u8)
        } else {
            Stars::Unknown
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Stars::Rated(_))
    }

    pub fn value(&self) -> Option<u8> {
        match self {
            Stars::Rated(n) => Some(*n),
            Stars::Unknown => None,
        }
    }
}

impl Serialize for Stars {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Stars::Rated(n) => serializer.serialize_u8(*n),
            Stars::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

struct StarsVisitor;

impl<'de> Visitor<'de> for StarsVisitor {
    type Value = Stars;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an integer in 1..=5 or the string \"unknown\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Stars, E> {
        Ok(Stars::from_raw(v.min(i64::MAX as u64) as i64))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Stars, E> {
        Ok(Stars::from_raw(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Stars, E> {
        match v {
            "unknown" => Ok(Stars::Unknown),
            other => Err(de::Error::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Stars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Stars, D::Error> {
        deserializer.deserialize_any(StarsVisitor)
    }
}

/// One decoded review record.
///
/// Constructed once by the record assembler and never mutated afterwards;
/// `review_id` is the identity used for deduplication across directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub review_id: String,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub reviewer_url: String,
    pub reviewer_photo_url: String,
    pub reviewer_number_of_reviews: u32,
    pub is_local_guide: bool,
    pub stars: Stars,
    pub text: String,
    /// Two-letter language code, empty when not transmitted.
    pub language: String,
    pub likes_count: u32,
    pub images: Vec<String>,
    /// Owner's public reply, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at_date: Option<DateTime<Utc>>,
    /// Relative-time string exactly as the source sent it ("3 months ago").
    pub time_ago: String,
}

impl Review {
    /// Whether the record carries anything a downstream consumer would
    /// consider meaningful. Used by the optional quality filter.
    pub fn has_content(&self) -> bool {
        !self.text.is_empty() || self.stars.is_known()
    }
}
