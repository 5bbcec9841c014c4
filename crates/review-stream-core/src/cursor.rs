use review_stream_models::SortDirection;

/// Pagination state for one traversal direction.
///
/// The cursor starts on the first page (no token) or on a resume token, and
/// becomes exhausted either when a page arrives without a continuation token
/// or when the fetcher stops the direction early via [`TokenCursor::finish`].
/// An exhausted cursor never resurrects.
#[derive(Debug)]
pub struct TokenCursor {
    direction: SortDirection,
    token: Option<String>,
    exhausted: bool,
    pages_fetched: u32,
}

impl TokenCursor {
    pub fn new(direction: SortDirection, initial: Option<String>) -> Self {
        Self {
            direction,
            token: initial,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Token for the next request; `None` on the first page.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Records one successfully decoded page and moves to its continuation.
    pub fn advance(&mut self, next: Option<String>) {
        self.pages_fetched += 1;
        if self.exhausted {
            return;
        }
        self.exhausted = next.is_none();
        self.token = next;
    }

    /// Ends the direction early (stop signal, overlap, unrecoverable error).
    pub fn finish(&mut self) {
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Token to resume from if the direction was cut short, `None` when the
    /// direction ran to natural exhaustion.
    pub fn into_resume_token(self) -> Option<String> {
        self.token
    }
}
