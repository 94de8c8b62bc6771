//! Page URL helpers: room channel address, join links, auto-join room.

use url::Url;

use crate::error::{CollabError, Result};

/// Query key carrying the room id in page URLs.
pub const ROOM_QUERY_KEY: &str = "room";

/// Room named by the page URL, if any.
pub fn room_from_url(page: &Url) -> Option<String> {
    page.query_pairs()
        .find(|(key, _)| key == ROOM_QUERY_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|room| !room.is_empty())
}

/// Shareable link: the page URL with its `room` key set to `room_id`.
/// Other query keys are preserved.
pub fn join_link(page: &Url, room_id: &str) -> Url {
    let kept: Vec<(String, String)> = page
        .query_pairs()
        .filter(|(key, _)| key != ROOM_QUERY_KEY)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut link = page.clone();
    link.query_pairs_mut()
        .clear()
        .extend_pairs(kept.iter())
        .append_pair(ROOM_QUERY_KEY, room_id);
    link
}

/// WebSocket address of a room: same host as the page, `/ws/{room_id}`.
pub fn channel_url(page: &Url, room_id: &str) -> Result<Url> {
    let scheme = match page.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(CollabError::Config(format!(
                "cannot derive a room channel from a {other} URL"
            )))
        }
    };

    let mut url = page.clone();
    url.set_scheme(scheme)
        .map_err(|_| CollabError::Config(format!("cannot switch {page} to {scheme}")))?;
    url.set_query(None);
    url.set_fragment(None);
    url.set_path("/ws");
    url.path_segments_mut()
        .map_err(|_| CollabError::Config(format!("{page} cannot carry a path")))?
        .push(room_id);
    Ok(url)
}
