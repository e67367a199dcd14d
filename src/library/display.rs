use crate::config::TrackDisplayField;

use super::model::Track;

/// Build a display string for `track` from the configured `fields` and separator.
///
/// Blank fields are skipped; falls back to the title (then the id) when
/// nothing was produced.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for f in fields {
        let value = match f {
            TrackDisplayField::Title => Some(track.title.as_str()),
            TrackDisplayField::Artist => Some(track.artist.as_str()),
            TrackDisplayField::Id => Some(track.id.as_str()),
            TrackDisplayField::Locator => track.audio_url.as_deref(),
        };
        if let Some(v) = value.map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(v);
        }
    }

    if !parts.is_empty() {
        return parts.join(sep);
    }
    if track.title.trim().is_empty() {
        track.id.clone()
    } else {
        track.title.clone()
    }
}
