use crate::maps::place::PlaceId;
use review_stream_models::SortDirection;

pub const LISTUGCPOSTS_URL: &str = "https://www.google.com/maps/rpc/listugcposts";

/// Reviews requested per page. The endpoint caps this at 20.
const PAGE_SIZE: u32 = 20;

/// Builds the querystring for one listugcposts request.
///
/// The `pb` value is an undocumented protobuf-ish path expression; the only
/// parts we vary are the place id, the continuation token slot after `!2s`,
/// and the trailing sort code.
pub fn listugcposts_query(
    place_id: &PlaceId,
    token: Option<&str>,
    direction: SortDirection,
) -> Vec<(&'static str, String)> {
    let pb = format!(
        "!1m6!1s0x{place}!6m4!4m1!1e1!4m1!1e3!2m2!1i{page_size}!2s{token}\
         !5m2!1sStliaIi6EPWA9u8PwLTBwAE!7e81!8m9!2b1!3b1!5b1!7b1!12m4!1b1!2b1!4m1!1e1!11m0!13m1!{sort}",
        place = place_id.as_str(),
        page_size = PAGE_SIZE,
        token = token.unwrap_or(""),
        sort = direction.sort_code(),
    );

    vec![
        ("authuser", "0".to_string()),
        ("hl", "en".to_string()),
        ("pb", pb),
    ]
}
