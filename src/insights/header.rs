//! # Header Normalization
//!
//! Vendor reports label the same column in many ways ("Amount spent (USD)",
//! "Amount spent (EUR)", "CTR (all)"). Every header is reduced to one canonical
//! key before rows are mapped.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));
static REPEATED_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid regex"));
static CURRENCY_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"_(usd|eur|gbp|jpy|vnd|aud|cad|sgd|inr|brl|mxn|krw|thb|idr|php|myr|twd|hkd|chf|sek|nok|dkk|pln|nzd|zar|cny)$",
    )
    .expect("valid regex")
});
static LINK_CTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ctr_*\(link_click-through_rate\)").expect("valid regex"));
static AMOUNT_SPENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^amount_spent").expect("valid regex"));
static VIDEO_PLAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[-_]?seconds?_video_plays").expect("valid regex"));

/// Reduce a raw column name to its canonical key. Total and idempotent.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
    let underscored = WHITESPACE_RE.replace_all(&lowered, "_");

    // The only parenthetical that changes meaning rather than decorating.
    if LINK_CTR_RE.is_match(&underscored) {
        return "link_ctr".to_string();
    }

    let stripped = PARENTHETICAL_RE.replace_all(&underscored, "");
    let mut key = REPEATED_UNDERSCORE_RE
        .replace_all(&stripped, "_")
        .trim_matches('_')
        .to_string();

    loop {
        let before = key.len();
        if let Some(rest) = key.strip_suffix("_all") {
            key = rest.to_string();
        }
        key = CURRENCY_SUFFIX_RE.replace(&key, "").into_owned();
        key = key.trim_end_matches('_').to_string();
        if key.len() == before {
            break;
        }
    }

    if AMOUNT_SPENT_RE.is_match(&key) {
        return "spend".to_string();
    }
    if VIDEO_PLAYS_RE.is_match(&key) {
        return "video_plays".to_string();
    }

    match key.as_str() {
        "adset_id" => "ad_set_id".to_string(),
        "adset_name" => "ad_set_name".to_string(),
        _ => key,
    }
}

/// Column layout of a report, resolved once from its header row.
///
/// When two raw headers normalize to the same key the first column wins and
/// later ones are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLayout {
    columns: Vec<Option<String>>,
}

impl HeaderLayout {
    pub fn from_raw<I, S>(raw_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let columns = raw_headers
            .into_iter()
            .map(|raw| {
                let key = normalize_header(raw.as_ref());
                (!key.is_empty() && seen.insert(key.clone())).then_some(key)
            })
            .collect();
        Self { columns }
    }

    /// Number of physical columns, including ignored ones.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|column| column.as_deref())
    }

    /// Pair one row's fields with their canonical keys.
    pub fn row(&self, fields: Vec<String>) -> HashMap<String, String> {
        self.columns
            .iter()
            .zip(fields)
            .filter_map(|(column, value)| column.as_ref().map(|key| (key.clone(), value)))
            .collect()
    }
}
