//! Supported locales and locale-prefix handling for site paths.
//!
//! Every page lives under a two-letter locale segment (`/en/...`, `/nb/...`).
//! The prefix is only recognized as a whole segment, so `/english` is not an
//! `en` path.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    Nb,
}

impl Locale {
    pub const DEFAULT: Self = Self::En;
    pub const ALL: [Self; 2] = [Self::En, Self::Nb];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Nb => "nb",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Self::En),
            "nb" => Some(Self::Nb),
            _ => None,
        }
    }

    /// Locale named by the first segment of `path`, if any.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        let segment = rest.split('/').next().unwrap_or_default();
        Self::parse(segment)
    }

    /// Locale of `path`, falling back to [`Locale::DEFAULT`].
    #[must_use]
    pub fn detect(path: &str) -> Self {
        Self::from_path(path).unwrap_or(Self::DEFAULT)
    }

    /// Pick a locale from an `Accept-Language` header value.
    ///
    /// Tags are taken in header order; quality weights are not ranked.
    #[must_use]
    pub fn negotiate(accept_language: Option<&str>) -> Self {
        let Some(header) = accept_language else {
            return Self::DEFAULT;
        };

        header
            .split(',')
            .filter_map(|entry| entry.split(';').next())
            .map(|tag| tag.trim().to_ascii_lowercase())
            .find_map(|tag| {
                let primary = tag.split('-').next().unwrap_or_default();
                match primary {
                    "en" => Some(Self::En),
                    // Norwegian without a written-standard subtag is served as bokmål.
                    "nb" | "no" => Some(Self::Nb),
                    _ => None,
                }
            })
            .unwrap_or(Self::DEFAULT)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path with its locale prefix removed; `/en` alone becomes `/`.
#[must_use]
pub fn strip_locale(path: &str) -> &str {
    let Some(locale) = Locale::from_path(path) else {
        return path;
    };
    let rest = &path[1 + locale.as_str().len()..];
    if rest.is_empty() {
        "/"
    } else {
        rest
    }
}
