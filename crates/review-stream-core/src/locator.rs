//! Structural field locators for raw review records.
//!
//! The upstream payload is deeply nested, mostly-null and positionally
//! unstable, so individual fields are found by shape rather than by fixed
//! index. Every locator is a pure function over an immutable record and
//! returns a default when the shape it looks for is absent.

use review_stream_models::Stars;
use serde_json::Value;

/// Host that serves reviewer avatars. The reviewer block is recognized by a
/// photo URL on this host sitting right after the display name.
pub const PROFILE_IMAGE_HOST: &str = "https://lh3.googleusercontent.com";

/// Prefixes of user-uploaded review photos, as opposed to avatars and other
/// static assets on the same host.
pub const CONTENT_IMAGE_PREFIXES: [&str; 2] = [
    "https://lh3.googleusercontent.com/geougc-cs",
    "https://lh3.googleusercontent.com/places/",
];

const MIN_TEXT_LEN: usize = 4;
const MAX_TEXT_LEN: usize = 10_000;
const MIN_IMAGE_URL_LEN: usize = 40;

// Microsecond timestamps between 2001-09-09 and 2100-01-01. Narrow enough
// to never collide with counters or coordinates encoded as integers.
const MIN_EPOCH_MICROS: i64 = 1_000_000_000_000_000;
const MAX_EPOCH_MICROS: i64 = 4_102_444_800_000_000;

/// Reviewer identity block as it appears inside a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewerMeta {
    pub name: String,
    pub photo_url: String,
    pub profile_url: String,
    pub reviewer_id: String,
    pub review_count: u32,
    pub is_local_guide: bool,
}

/// Stable identity of the record: first element of the leading metadata
/// block, with a shape-based fallback for records where that block moved.
pub fn find_review_id(record: &Value) -> Option<String> {
    let direct = record
        .get(0)
        .and_then(|meta| meta.get(0))
        .and_then(Value::as_str)
        .filter(|s| looks_like_id(s));
    if let Some(id) = direct {
        return Some(id.to_string());
    }

    fn walk(value: &Value) -> Option<&str> {
        match value {
            Value::String(s) if looks_like_id(s) => Some(s),
            Value::Array(seq) => seq.iter().find_map(walk),
            _ => None,
        }
    }
    walk(record).map(String::from)
}

fn looks_like_id(s: &str) -> bool {
    s.len() >= 16
        && !s.starts_with("http")
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '='))
}

/// Star rating, recognized as a doubly-wrapped small integer `[[n]]`.
pub fn find_rating(record: &Value) -> Stars {
    fn walk(value: &Value) -> Option<i64> {
        let seq = value.as_array()?;
        if seq.len() == 1 {
            if let Some(inner) = seq[0].as_array() {
                if inner.len() == 1 {
                    if let Some(n) = inner[0].as_i64() {
                        if (1..=5).contains(&n) {
                            return Some(n);
                        }
                    }
                }
            }
        }
        seq.iter().find_map(walk)
    }
    walk(record).map(Stars::from_raw).unwrap_or(Stars::Unknown)
}

/// Review body and language code.
///
/// The body lives in a `[text, null, [offset, length]]` bucket; the record
/// often carries an original-language copy followed by a translation, and the
/// last bucket is the one shown to users. The language code, when present, is
/// the sibling directly before that bucket.
pub fn find_text(record: &Value) -> (String, String) {
    fn language_of(sibling: &Value) -> Option<&str> {
        let code = match sibling {
            Value::String(s) => s.as_str(),
            Value::Array(seq) if seq.len() == 1 => seq[0].as_str()?,
            _ => return None,
        };
        (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then_some(code)
    }

    fn walk(value: &Value) -> Option<(String, String)> {
        let seq = value.as_array()?;
        for (i, child) in seq.iter().enumerate().rev() {
            if let Some(text) = bucket_text(child) {
                let language = i
                    .checked_sub(1)
                    .and_then(|prev| language_of(&seq[prev]))
                    .unwrap_or("");
                return Some((text.to_string(), language.to_string()));
            }
            if let Some(found) = walk(child) {
                return Some(found);
            }
        }
        None
    }

    walk(record).unwrap_or_default()
}

fn bucket_text(value: &Value) -> Option<&str> {
    let seq = value.as_array()?;
    if seq.len() < 3 || !seq[1].is_null() {
        return None;
    }
    let text = seq[0].as_str()?;
    let span = seq[2].as_array()?;
    if span.len() != 2 || !span[0].is_number() || !span[1].is_number() {
        return None;
    }
    if text.len() < MIN_TEXT_LEN || text.len() > MAX_TEXT_LEN || text.starts_with("http") {
        return None;
    }
    Some(text)
}

/// Owner's public reply.
///
/// Lives in the bucket directly after the review-text bucket, with its text
/// wrapped one level deeper than the review text itself.
pub fn find_owner_response(record: &Value) -> Option<String> {
    fn reply_of(sibling: &Value) -> Option<&str> {
        let text = sibling.as_array()?.first()?.as_array()?.first()?.as_str()?;
        (text.len() >= MIN_TEXT_LEN && text.len() <= MAX_TEXT_LEN && !text.starts_with("http"))
            .then_some(text)
    }

    fn walk(value: &Value) -> Option<Option<String>> {
        let seq = value.as_array()?;
        for (i, child) in seq.iter().enumerate().rev() {
            if bucket_text(child).is_some() {
                return Some(seq.get(i + 1).and_then(reply_of).map(String::from));
            }
            if let Some(found) = walk(child) {
                return Some(found);
            }
        }
        None
    }

    walk(record).flatten()
}

/// Reviewer block: a sequence whose first element is the display name and
/// whose second is an avatar URL on the profile-image host.
pub fn find_reviewer(record: &Value) -> ReviewerMeta {
    fn parse_block(seq: &[Value]) -> Option<ReviewerMeta> {
        let name = seq.first()?.as_str()?;
        let photo = seq.get(1)?.as_str()?;
        if name.is_empty() || !photo.starts_with(PROFILE_IMAGE_HOST) {
            return None;
        }

        let profile_url = match seq.get(2) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(inner)) => inner
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };

        Some(ReviewerMeta {
            name: name.to_string(),
            photo_url: photo.to_string(),
            profile_url,
            reviewer_id: seq.get(3).map(scalar_to_string).unwrap_or_default(),
            review_count: seq.get(5).and_then(Value::as_u64).unwrap_or(0) as u32,
            is_local_guide: seq.get(12).map(is_truthy).unwrap_or(false),
        })
    }

    fn walk(value: &Value) -> Option<ReviewerMeta> {
        let seq = value.as_array()?;
        if let Some(meta) = parse_block(seq) {
            return Some(meta);
        }
        seq.iter().find_map(walk)
    }

    walk(record).unwrap_or_default()
}

/// Helpful-vote counter, encoded as a tagged pair `[1, count]`.
pub fn find_likes(record: &Value) -> u32 {
    fn walk(value: &Value) -> Option<u32> {
        let seq = value.as_array()?;
        if seq.len() == 2 && seq[0].as_i64() == Some(1) {
            if let Some(n) = seq[1].as_u64() {
                if n > 0 {
                    return Some(n.min(u32::MAX as u64) as u32);
                }
            }
        }
        seq.iter().find_map(walk)
    }
    walk(record).unwrap_or(0)
}

/// User-uploaded photo URLs, in record order and deduplicated.
pub fn find_images(record: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s)
                if s.len() >= MIN_IMAGE_URL_LEN
                    && CONTENT_IMAGE_PREFIXES.iter().any(|p| s.starts_with(p)) =>
            {
                if !out.iter().any(|seen| seen == s) {
                    out.push(s.clone());
                }
            }
            Value::Array(seq) => {
                for child in seq {
                    walk(child, out);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(record, &mut out);
    out
}

/// Publication time in epoch microseconds. The metadata block carries it at
/// a fixed position; the fallback accepts any integer in the plausible range.
pub fn find_published_micros(record: &Value) -> Option<i64> {
    let direct = record
        .get(0)
        .and_then(|meta| meta.get(1))
        .and_then(|times| times.get(2))
        .and_then(Value::as_i64)
        .filter(|n| (MIN_EPOCH_MICROS..=MAX_EPOCH_MICROS).contains(n));
    if direct.is_some() {
        return direct;
    }

    fn walk(value: &Value) -> Option<i64> {
        match value {
            Value::Number(_) => value
                .as_i64()
                .filter(|n| (MIN_EPOCH_MICROS..=MAX_EPOCH_MICROS).contains(n)),
            Value::Array(seq) => seq.iter().find_map(walk),
            _ => None,
        }
    }
    walk(record)
}

/// Relative-time label ("3 months ago"), passed through verbatim.
pub fn find_time_ago(record: &Value) -> String {
    fn walk(value: &Value) -> Option<&str> {
        match value {
            Value::String(s) if s.len() < 40 && s.ends_with(" ago") => Some(s),
            Value::Array(seq) => seq.iter().find_map(walk),
            _ => None,
        }
    }
    walk(record).unwrap_or_default().to_string()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}
