use std::fmt;
use std::path::PathBuf;

/// A playable item's metadata and optional resource locator.
///
/// Tracks are produced by the persistence collaborator; this crate only
/// clones them and never mutates identity fields. Equality is id-only.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Duration in whole seconds; always > 0 for a playable track.
    pub duration_secs: u32,
    /// Path to the audio resource, when one is known.
    pub resource_path: Option<PathBuf>,
}

impl Track {
    /// Renders the track duration as `mm:ss`.
    pub fn formatted_duration(&self) -> String {
        format_time(self.duration_secs)
    }
}

/// Formats whole seconds as `mm:ss`.
pub(crate) fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64, title: &str) -> Track {
        Track {
            id,
            title: title.to_string(),
            artist: "Queen".to_string(),
            album: None,
            duration_secs: 354,
            resource_path: None,
        }
    }

    #[test]
    fn equality_is_id_only() {
        let a = track(1, "Bohemian Rhapsody");
        let same_id = track(1, "Renamed");
        let other = track(2, "Bohemian Rhapsody");
        assert_eq!(a, same_id);
        assert_ne!(a, other);
    }

    #[test]
    fn duration_formats_as_minutes_seconds() {
        assert_eq!(track(1, "t").formatted_duration(), "05:54");
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(61), "01:01");
    }

    #[test]
    fn displays_title_and_artist() {
        assert_eq!(
            track(1, "Bohemian Rhapsody").to_string(),
            "Bohemian Rhapsody - Queen"
        );
    }
}
