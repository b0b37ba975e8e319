use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

pub const TAG_MARKER: char = '#';
const URL_MARKER: &str = "%23";

// Player tags historically shipped with 8 characters; 7 and 9 both exist in
// the wild, so the window is inclusive on both ends.
const PLAYER_TAG_MIN_LEN: usize = 7;
const PLAYER_TAG_MAX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Player,
    Club,
}

impl TagKind {
    pub fn label(self) -> &'static str {
        match self {
            TagKind::Player => "player",
            TagKind::Club => "club",
        }
    }

    fn length_bounds(self) -> Option<(usize, usize)> {
        match self {
            TagKind::Player => Some((PLAYER_TAG_MIN_LEN, PLAYER_TAG_MAX_LEN)),
            TagKind::Club => None,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("{kind} tag must contain only uppercase letters A-Z and digits 0-9 (got {raw:?})")]
    Charset { kind: TagKind, raw: String },
    #[error("{kind} tag must be between {min}-{max} characters after '#' (got {len})")]
    Length {
        kind: TagKind,
        min: usize,
        max: usize,
        len: usize,
    },
}

/// A validated player or club tag, always stored with its leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    kind: TagKind,
    value: String,
}

impl Tag {
    pub fn parse(kind: TagKind, raw: &str) -> Result<Self, TagError> {
        let value = normalize_tag(raw);
        let body = strip_marker(&value);

        let charset_ok =
            !body.is_empty() && body.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !charset_ok {
            return Err(TagError::Charset {
                kind,
                raw: raw.to_string(),
            });
        }

        if let Some((min, max)) = kind.length_bounds() {
            let len = body.chars().count();
            if len < min || len > max {
                return Err(TagError::Length {
                    kind,
                    min,
                    max,
                    len,
                });
            }
        }

        Ok(Self { kind, value })
    }

    pub fn player(raw: &str) -> Result<Self, TagError> {
        Self::parse(TagKind::Player, raw)
    }

    pub fn club(raw: &str) -> Result<Self, TagError> {
        Self::parse(TagKind::Club, raw)
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn body(&self) -> &str {
        strip_marker(&self.value)
    }

    /// Tag with the marker percent-encoded, ready to splice into an API path.
    pub fn url_encoded(&self) -> String {
        format!("{URL_MARKER}{}", self.body())
    }

    /// `base_dir/{tag}/{YYYY-MM-DD}/{filename}`
    pub fn partition_path(&self, base_dir: &Path, date: NaiveDate, filename: &str) -> PathBuf {
        base_dir
            .join(&self.value)
            .join(date_dir_name(date))
            .join(filename)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

pub fn normalize_tag(raw: &str) -> String {
    if raw.starts_with(TAG_MARKER) {
        raw.to_string()
    } else {
        format!("{TAG_MARKER}{raw}")
    }
}

pub fn strip_marker(tag: &str) -> &str {
    tag.strip_prefix(TAG_MARKER).unwrap_or(tag)
}

pub fn date_dir_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_dir(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}
