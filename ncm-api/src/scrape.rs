//! HTML scrapers for the routes that have no JSON API.
//!
//! These parsers are self-contained: every failure is a [`ScrapeError`], which
//! the adapters turn into an error envelope. Nothing here can fail the generic
//! JSON pipeline.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

const GUSER_MARKER: &str = "GUser=";
const GBINDS_MARKER: &str = "GBinds=";

const USER_HREF_PREFIX: &str = "/user/home?id=";
const PLAYLIST_HREF_PREFIX: &str = "/playlist?id=";
const THUMBNAIL_SUFFIX: &str = "?param=50y50";

static PLAYLIST_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<div class="cver u-cover u-cover-3">[\s\S]*?<img src="([^"]+)">[\s\S]*?"#,
        r#"<a class="sname f-fs1 s-fc0" href="([^"]+)"[^>]*>([^<]+?)</a>[\s\S]*?"#,
        r#"<a class="nm nm f-thide s-fc3" href="([^"]+)"[^>]*>([^<]+?)</a>"#,
    ))
    .expect("valid playlist card regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("marker `{0}` not found")]
    MissingMarker(&'static str),

    #[error("invalid JSON after `{0}`: {1}")]
    BadJson(&'static str, String),

    /// A matched card had an unexpected link format.
    #[error("unexpected playlist card link: {0}")]
    BadCard(String),
}

/// Parse the first JSON value that follows `marker`, ignoring what comes after.
fn json_after<T>(page: &str, marker: &'static str) -> Result<T, ScrapeError>
where
    T: for<'de> Deserialize<'de>,
{
    let start = page
        .find(marker)
        .ok_or(ScrapeError::MissingMarker(marker))?
        + marker.len();
    serde_json::Deserializer::from_str(&page[start..])
        .into_iter::<T>()
        .next()
        .ok_or_else(|| ScrapeError::BadJson(marker, "no value".into()))?
        .map_err(|e| ScrapeError::BadJson(marker, e.to_string()))
}

/// Extract `{code: 200, profile, bindings}` from the logged-in home page.
///
/// `GUser=` must be followed by a JSON object and `GBinds=` by a JSON array.
pub fn login_status(page: &str) -> Result<Value, ScrapeError> {
    let profile: Map<String, Value> = json_after(page, GUSER_MARKER)?;
    let bindings: Vec<Value> = json_after(page, GBINDS_MARKER)?;
    Ok(json!({ "code": 200, "profile": profile, "bindings": bindings }))
}

/// Extract related playlist cards from a public playlist page.
///
/// A page without cards yields an empty list; one malformed card fails the
/// whole page.
pub fn related_playlists(page: &str) -> Result<Vec<Value>, ScrapeError> {
    PLAYLIST_CARD
        .captures_iter(page)
        .map(|caps| {
            let cover = &caps[1];
            let playlist_id = caps[2]
                .strip_prefix(PLAYLIST_HREF_PREFIX)
                .ok_or_else(|| ScrapeError::BadCard(caps[2].to_owned()))?;
            let user_id = caps[4]
                .strip_prefix(USER_HREF_PREFIX)
                .ok_or_else(|| ScrapeError::BadCard(caps[4].to_owned()))?;
            Ok(json!({
                "creator": { "userId": user_id, "nickname": &caps[5] },
                "coverImgUrl": cover.strip_suffix(THUMBNAIL_SUFFIX).unwrap_or(cover),
                "name": &caps[3],
                "id": playlist_id,
            }))
        })
        .collect()
}
