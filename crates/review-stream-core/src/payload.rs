use crate::error::DecodeError;
use serde_json::Value;

/// Anti-hijacking prefix the endpoint prepends to every JSON response.
pub const RPC_PREFIX: &str = ")]}'";

/// One decoded page: the continuation token for the next request in the
/// same direction, and the raw per-review records.
#[derive(Debug, Clone)]
pub struct Page {
    pub next_token: Option<String>,
    pub records: Vec<Value>,
}

/// Parses one raw page response into its generic nested-sequence form.
///
/// Only two positions of the root sequence are treated as stable: index 1
/// carries the continuation token (null or empty means the direction is
/// exhausted) and index 2 carries the record sequence. Everything inside a
/// record is left untyped for the field locators.
pub fn decode_page(bytes: &[u8]) -> Result<Page, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let body = text.strip_prefix(RPC_PREFIX).unwrap_or(text);

    let root: Value = serde_json::from_str(body.trim_start())?;
    let root = root.as_array().ok_or(DecodeError::NotASequence)?;

    let next_token = root
        .get(1)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let records = root
        .get(2)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(Page {
        next_token,
        records,
    })
}
