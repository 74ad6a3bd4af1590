use crate::error::{Result, ServerError};

const DEFAULT_RESULTS: u32 = 3;
const RESULTS_MIN: u32 = 1;
const RESULTS_MAX: u32 = 20;

const DEFAULT_SNIPPET_LENGTH: usize = 150;
const SNIPPET_MIN: usize = 50;
const SNIPPET_MAX: usize = 500;

const DEFAULT_PER_SECOND_LIMIT: u32 = 1;
const DEFAULT_PER_MONTH_LIMIT: u32 = 15_000;

/// Output rendering mode for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Dense,
    Minimal,
    Json,
}

impl OutputMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "dense" => Some(Self::Dense),
            "minimal" => Some(Self::Minimal),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Immutable configuration snapshot, resolved once at startup and shared
/// read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_results: u32,
    pub snippet_length: usize,
    pub full_content: bool,
    pub strip_emoji: bool,
    pub output: OutputMode,
    pub per_second_limit: u32,
    pub per_month_limit: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_results: DEFAULT_RESULTS,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            full_content: false,
            strip_emoji: true,
            output: OutputMode::Dense,
            per_second_limit: DEFAULT_PER_SECOND_LIMIT,
            per_month_limit: DEFAULT_PER_MONTH_LIMIT,
            log_level: "info".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an explicit lookup so tests can supply
    /// values without touching the process environment.
    pub fn resolve(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            default_results: clamped_u32(&get, "DDG_DEFAULT_RESULTS", DEFAULT_RESULTS, RESULTS_MIN, RESULTS_MAX)?,
            snippet_length: clamped_usize(&get, "DDG_SNIPPET_LENGTH", DEFAULT_SNIPPET_LENGTH, SNIPPET_MIN, SNIPPET_MAX)?,
            full_content: flag(&get, "DDG_FULL_CONTENT", false),
            strip_emoji: flag(&get, "DDG_STRIP_EMOJI", true),
            output: output_mode(&get)?,
            per_second_limit: strict_u32(&get, "DDG_RATE_LIMIT_PER_SECOND", DEFAULT_PER_SECOND_LIMIT)?,
            per_month_limit: strict_u32(&get, "DDG_RATE_LIMIT_PER_MONTH", DEFAULT_PER_MONTH_LIMIT)?,
            log_level: opt(&get, "DDG_LOG_LEVEL").unwrap_or_else(|| "info".into()),
        })
    }
}

fn opt(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    get(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn flag(get: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match opt(get, name) {
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

/// Bounded numeric key: a non-numeric value is a startup error, an
/// out-of-range value is coerced to the nearest bound.
fn clamped_u32(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32> {
    let Some(raw) = opt(get, name) else { return Ok(default) };
    let val: u32 = raw
        .parse()
        .map_err(|_| ServerError::ConfigInvalid(format!("{name} must be an integer")))?;
    Ok(val.clamp(min, max))
}

fn clamped_usize(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize> {
    let Some(raw) = opt(get, name) else { return Ok(default) };
    let val: usize = raw
        .parse()
        .map_err(|_| ServerError::ConfigInvalid(format!("{name} must be an integer")))?;
    Ok(val.clamp(min, max))
}

/// Rate caps must be well-formed and at least 1; anything else fails startup.
fn strict_u32(get: &impl Fn(&str) -> Option<String>, name: &str, default: u32) -> Result<u32> {
    let Some(raw) = opt(get, name) else { return Ok(default) };
    let val: u32 = raw
        .parse()
        .map_err(|_| ServerError::ConfigInvalid(format!("{name} must be a positive integer")))?;
    if val == 0 {
        return Err(ServerError::ConfigInvalid(format!("{name} must be a positive integer")));
    }
    Ok(val)
}

fn output_mode(get: &impl Fn(&str) -> Option<String>) -> Result<OutputMode> {
    match opt(get, "DDG_OUTPUT_FORMAT") {
        None => Ok(OutputMode::Dense),
        Some(raw) => OutputMode::parse(&raw).ok_or_else(|| {
            ServerError::ConfigInvalid("DDG_OUTPUT_FORMAT must be one of dense, minimal, json".into())
        }),
    }
}
