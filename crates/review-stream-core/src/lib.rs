pub mod assembler;
pub mod cursor;
pub mod error;
pub mod locator;
pub mod overlap;
pub mod payload;
pub mod pipeline;

pub use assembler::assemble;
pub use cursor::TokenCursor;
pub use error::{DecodeError, PipelineError};
pub use overlap::OverlapTracker;
pub use payload::{decode_page, Page};
pub use pipeline::{DirectionSummary, PipelineOutcome, ScrapePipeline, StopSignal};
