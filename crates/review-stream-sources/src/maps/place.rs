use regex::Regex;
use std::fmt;

/// A Google Maps place identifier in its `hex:0xhex` form, stored without
/// the leading `0x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceId(String);

impl PlaceId {
    /// Normalizes a raw id as users paste it (`1s0x…`, `0x…`, or bare).
    pub fn new(raw: &str) -> Self {
        let id = raw
            .strip_prefix("1s0x")
            .or_else(|| raw.strip_prefix("0x"))
            .unwrap_or(raw);
        Self(id.to_string())
    }

    /// Extracts the place id from a Google Maps place URL.
    ///
    /// The id appears in several encodings depending on how the URL was
    /// produced; `!1s0x…:0x…` inside the data blob is the most common.
    pub fn from_url(url: &str) -> Option<Self> {
        // Compiled per call: URL parsing happens once per invocation.
        let patterns = [
            r"!1s0x([a-f0-9]+):0x([a-f0-9]+)",
            r"1s0x([a-f0-9]+):0x([a-f0-9]+)",
            r"0x([a-f0-9]+):0x([a-f0-9]+)",
        ];
        for pattern in patterns {
            let re = Regex::new(pattern).expect("static regex");
            if let Some(caps) = re.captures(url) {
                return Some(Self(format!("{}:0x{}", &caps[1], &caps[2])));
            }
        }
        None
    }

    /// Hex body as spliced into the request querystring (no `0x` prefix).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form used for output file names.
    pub fn file_stem(&self) -> String {
        self.0.replace(':', "_")
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}
