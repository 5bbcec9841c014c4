use chrono::Utc;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use review_stream_core::PipelineOutcome;
use review_stream_sources::PlaceId;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "✓".green(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "success", "message": msg.as_ref() }));
            }
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        // Errors are shown even in quiet mode.
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", "✗".red(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "error", "message": msg.as_ref() }));
            }
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                println!("{}", msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "info", "message": msg.as_ref() }));
            }
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "⚠".yellow(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "warning", "message": msg.as_ref() }));
            }
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(data).unwrap_or_default());
            }
            OutputFormat::JsonPretty | OutputFormat::Human => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
        }
    }
}

/// Writes the run result as one pretty-printed JSON file named after the
/// place, and returns the path.
pub fn write_reviews(
    dir: &Path,
    place_id: &PlaceId,
    outcome: &PipelineOutcome,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("reviews_{}.json", place_id.file_stem()));

    let payload = json!({
        "placeId": place_id.as_str(),
        "fetchedAt": Utc::now().to_rfc3339(),
        "count": outcome.reviews.len(),
        "duplicatesDiscarded": outcome.duplicates_discarded,
        "directions": outcome.directions,
        "reviews": outcome.reviews,
    });

    std::fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_stream_models::{Review, SortDirection, Stars};

    fn outcome_with_one_review() -> PipelineOutcome {
        PipelineOutcome {
            reviews: vec![Review {
                review_id: "ChZDSUhNMG9nS0VJQ0FnSUNudGRhMGN3EAE".to_string(),
                reviewer_id: String::new(),
                reviewer_name: "Test Reviewer".to_string(),
                reviewer_url: String::new(),
                reviewer_photo_url: String::new(),
                reviewer_number_of_reviews: 0,
                is_local_guide: false,
                stars: Stars::Rated(5),
                text: "Worth the trip.".to_string(),
                language: "en".to_string(),
                likes_count: 0,
                images: Vec::new(),
                owner_response: None,
                published_at_date: None,
                time_ago: "a week ago".to_string(),
            }],
            directions: vec![review_stream_core::DirectionSummary {
                direction: SortDirection::HighestRated,
                pages_fetched: 1,
                records_pushed: 1,
                duplicates: 0,
                resume_token: None,
            }],
            duplicates_discarded: 0,
        }
    }

    #[test]
    fn test_write_reviews_names_file_after_place() {
        let dir = tempfile::tempdir().unwrap();
        let place_id = PlaceId::new("89c25a31ec8ae3e9:0xa0ab5e92c85cd1bc");

        let path = write_reviews(dir.path(), &place_id, &outcome_with_one_review()).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "reviews_89c25a31ec8ae3e9_0xa0ab5e92c85cd1bc.json"
        );

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["count"], 1);
        assert_eq!(written["reviews"][0]["stars"], 5);
        assert_eq!(written["directions"][0]["direction"], "highest_rated");
    }
}
