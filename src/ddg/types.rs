use serde::Deserialize;

/// Content-filtering strictness requested for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafeSearch {
    Strict,
    #[default]
    Moderate,
    Off,
}

impl SafeSearch {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "moderate" => Some(Self::Moderate),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    /// DuckDuckGo `p` filter constant.
    pub fn provider_level(self) -> &'static str {
        match self {
            Self::Strict => "1",
            Self::Moderate => "-1",
            Self::Off => "-2",
        }
    }
}

/// Provider-side recency filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeRange {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "day" | "d" => Some(Self::Day),
            "week" | "w" => Some(Self::Week),
            "month" | "m" => Some(Self::Month),
            "year" | "y" => Some(Self::Year),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// DuckDuckGo `df` constant. `All` means no time filter at all: the
    /// parameter is left off the request rather than sent as a sentinel.
    pub fn provider_window(self) -> Option<&'static str> {
        match self {
            Self::Day => Some("d"),
            Self::Week => Some("w"),
            Self::Month => Some("m"),
            Self::Year => Some("y"),
            Self::All => None,
        }
    }
}

pub const WORLDWIDE_REGION: &str = "wt-wt";

/// Region codes DuckDuckGo documents; anything else matching the
/// two-letter/two-letter pattern is passed through to the provider as-is.
pub const KNOWN_REGIONS: &[&str] = &[
    "wt-wt", "us-en", "uk-en", "ca-en", "ca-fr", "au-en", "nz-en", "ie-en",
    "de-de", "at-de", "ch-de", "fr-fr", "be-fr", "es-es", "it-it", "nl-nl",
    "pt-pt", "br-pt", "mx-es", "ar-es", "cl-es", "co-es", "pl-pl", "ru-ru",
    "se-sv", "no-no", "dk-da", "fi-fi", "cz-cs", "hu-hu", "gr-el", "tr-tr",
    "il-he", "sa-ar", "in-en", "id-en", "my-en", "ph-en", "sg-en", "th-en",
    "vn-vi", "cn-zh", "hk-tzh", "tw-tzh", "jp-jp", "kr-kr", "za-en",
];

pub fn is_valid_region(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    if KNOWN_REGIONS.contains(&lower.as_str()) {
        return true;
    }
    let bytes = lower.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'-'
        && bytes[..2].iter().all(u8::is_ascii_lowercase)
        && bytes[3..].iter().all(u8::is_ascii_lowercase)
}

/// Shaped search parameters handed to the provider.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub safe_search: SafeSearch,
    pub region: String,
    pub time: TimeRange,
}

/// One raw web result row as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct WebPage {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub hostname: String,
}

/// One raw news result row as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub source: String,
    /// Publication time, seconds since the Unix epoch.
    pub date: i64,
    pub relative_time: String,
}

/// Provider outcome: either rows, or an explicit no-results signal.
/// No results is terminal but not an error.
#[derive(Debug, Clone)]
pub struct SearchOutcome<T> {
    pub no_results: bool,
    pub results: Vec<T>,
}

impl<T> SearchOutcome<T> {
    pub fn empty() -> Self {
        Self { no_results: true, results: Vec::new() }
    }

    pub fn of(results: Vec<T>) -> Self {
        Self { no_results: results.is_empty(), results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_search_mapping_is_three_way() {
        assert_eq!(SafeSearch::Strict.provider_level(), "1");
        assert_eq!(SafeSearch::Moderate.provider_level(), "-1");
        assert_eq!(SafeSearch::Off.provider_level(), "-2");
        assert_eq!(SafeSearch::parse("STRICT"), Some(SafeSearch::Strict));
        assert_eq!(SafeSearch::parse("lenient"), None);
    }

    #[test]
    fn all_time_range_omits_the_parameter() {
        assert_eq!(TimeRange::All.provider_window(), None);
        assert_eq!(TimeRange::Day.provider_window(), Some("d"));
        assert_eq!(TimeRange::Year.provider_window(), Some("y"));
        assert_eq!(TimeRange::parse("week"), Some(TimeRange::Week));
        assert_eq!(TimeRange::parse("decade"), None);
    }

    #[test]
    fn region_accepts_known_codes_and_pattern() {
        assert!(is_valid_region("wt-wt"));
        assert!(is_valid_region("US-EN"));
        assert!(is_valid_region("de-at"));
        assert!(!is_valid_region("usa"));
        assert!(!is_valid_region("us_en"));
        assert!(!is_valid_region("u1-en"));
    }
}
