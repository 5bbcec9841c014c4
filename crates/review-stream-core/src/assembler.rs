use crate::locator;
use chrono::DateTime;
use review_stream_models::Review;
use serde_json::Value;

/// Assembles one raw record into a `Review`.
///
/// Every field locator tolerates absence, so the only way assembly fails is
/// a record with no usable identity; those are dropped by the caller since a
/// review without an id cannot be deduplicated.
pub fn assemble(record: &Value) -> Option<Review> {
    let review_id = locator::find_review_id(record)?;

    let reviewer = locator::find_reviewer(record);
    let (text, language) = locator::find_text(record);
    let published_at_date = locator::find_published_micros(record)
        .and_then(DateTime::from_timestamp_micros);

    Some(Review {
        review_id,
        reviewer_id: reviewer.reviewer_id,
        reviewer_name: reviewer.name,
        reviewer_url: reviewer.profile_url,
        reviewer_photo_url: reviewer.photo_url,
        reviewer_number_of_reviews: reviewer.review_count,
        is_local_guide: reviewer.is_local_guide,
        stars: locator::find_rating(record),
        text,
        language,
        likes_count: locator::find_likes(record),
        images: locator::find_images(record),
        owner_response: locator::find_owner_response(record),
        published_at_date,
        time_ago: locator::find_time_ago(record),
    })
}
