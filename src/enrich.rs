// Best-effort title and rater metadata for the top-stats panel

use crate::rank::Ranked;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/60";
pub const GENERIC_DESCRIPTION: &str = "No description available for this title.";
pub const JIKAN_SEARCH_URL: &str = "https://api.jikan.moe/v4/anime";
pub const AVATAR_BASE_URL: &str = "https://api.dicebear.com/6.x/avataaars/svg";

/// Best match for a title search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleInfo {
    pub image_url: Option<String>,
    pub synopsis: Option<String>,
}

/// External title search. `Ok(None)` means the service had no match.
pub trait TitleLookup: Send + Sync {
    fn lookup(&self, title: &str) -> Result<Option<TitleInfo>>;
}

/// Never matches anything; every title resolves to fallback data.
pub struct OfflineLookup;

impl TitleLookup for OfflineLookup {
    fn lookup(&self, _title: &str) -> Result<Option<TitleInfo>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct JikanResponse {
    #[serde(default)]
    data: Vec<JikanAnime>,
}

#[derive(Debug, Deserialize)]
struct JikanAnime {
    #[serde(default)]
    images: Option<JikanImages>,
    #[serde(default)]
    synopsis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JikanImages {
    #[serde(default)]
    jpg: Option<JikanImage>,
}

#[derive(Debug, Deserialize)]
struct JikanImage {
    #[serde(default)]
    image_url: Option<String>,
}

impl From<JikanAnime> for TitleInfo {
    fn from(anime: JikanAnime) -> Self {
        TitleInfo {
            image_url: anime.images.and_then(|i| i.jpg).and_then(|j| j.image_url),
            synopsis: anime.synopsis,
        }
    }
}

/// Parse a Jikan search response body, keeping only the first result.
pub fn parse_jikan_response(body: &str) -> Result<Option<TitleInfo>> {
    let response: JikanResponse = serde_json::from_str(body).context("Malformed search response")?;
    Ok(response.data.into_iter().next().map(TitleInfo::from))
}

/// Jikan (MyAnimeList) title search over blocking HTTP.
pub struct JikanLookup {
    client: reqwest::blocking::Client,
    endpoint: Url,
}

impl JikanLookup {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(JIKAN_SEARCH_URL)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).with_context(|| format!("Invalid search endpoint '{}'", endpoint))?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("animedash/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(JikanLookup { client, endpoint })
    }

    fn search_url(&self, title: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", title).append_pair("limit", "1");
        url
    }
}

impl TitleLookup for JikanLookup {
    fn lookup(&self, title: &str) -> Result<Option<TitleInfo>> {
        let url = self.search_url(title);
        let body = self
            .client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .context("Search request failed")?
            .error_for_status()
            .context("Search request rejected")?
            .text()
            .context("Failed to read search response")?;
        parse_jikan_response(&body)
    }
}

/// Display metadata attached to a ranked title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub image_url: String,
    pub description: String,
    /// Some or all fields are placeholders.
    pub fallback: bool,
}

impl Enrichment {
    pub fn placeholder(title: &str) -> Self {
        Enrichment {
            image_url: PLACEHOLDER_IMAGE.to_string(),
            description: fallback_description(title).to_string(),
            fallback: true,
        }
    }
}

/// Hand-written synopsis for well-known titles, generic text otherwise.
pub fn fallback_description(title: &str) -> &'static str {
    match title {
        "Naruto" => "A young ninja seeks recognition from his peers and dreams of becoming the Hokage.",
        "One Piece" => "Monkey D. Luffy sets sail with his crew in search of the legendary treasure, the One Piece.",
        "Attack on Titan" | "Shingeki no Kyojin" => {
            "Humanity fights for survival behind giant walls against man-eating Titans."
        }
        "Death Note" => "A student discovers a notebook that kills anyone whose name is written in it.",
        "Fullmetal Alchemist: Brotherhood" => {
            "Two brothers search for the Philosopher's Stone after a failed alchemical ritual."
        }
        "Sword Art Online" => "Players trapped in a virtual reality MMORPG must clear it to escape.",
        "Code Geass: Hangyaku no Lelouch" => {
            "An exiled prince gains the power of absolute obedience and leads a rebellion."
        }
        _ => GENERIC_DESCRIPTION,
    }
}

/// Look `title` up and fill any gaps with fallback data. Never fails.
pub fn resolve_title(lookup: &dyn TitleLookup, title: &str) -> Enrichment {
    match lookup.lookup(title) {
        Ok(Some(info)) => {
            let image_url = info.image_url.filter(|u| !u.trim().is_empty());
            let synopsis = info.synopsis.filter(|s| !s.trim().is_empty());
            let fallback = image_url.is_none() || synopsis.is_none();
            Enrichment {
                image_url: image_url.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                description: synopsis.unwrap_or_else(|| fallback_description(title).to_string()),
                fallback,
            }
        }
        Ok(None) => {
            log::debug!("No search result for '{}'", title);
            Enrichment::placeholder(title)
        }
        Err(err) => {
            log::warn!("Lookup failed for '{}': {:#}", title, err);
            Enrichment::placeholder(title)
        }
    }
}

/// Deterministic avatar URL seeded by `seed`.
pub fn avatar_url(seed: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(seed.as_bytes()).collect();
    format!("{}?seed={}", AVATAR_BASE_URL, encoded)
}

/// Memoized enrichments for the lifetime of one dataset load.
///
/// Each in-flight lookup is tagged with the region that was selected when it
/// was requested; a response is only accepted under the same tag.
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<String, Enrichment>,
    in_flight: HashMap<String, String>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, title: &str) -> Option<&Enrichment> {
        self.entries.get(title)
    }

    /// Claim `title` for a lookup requested under `region`. Returns `false`
    /// when it is cached or already in flight for the same region, in which
    /// case no new request is needed. A claim held by another region is
    /// taken over.
    pub fn begin(&mut self, title: &str, region: &str) -> bool {
        if self.entries.contains_key(title) {
            log::debug!("Enrichment cache HIT: {}", title);
            return false;
        }
        if self.in_flight.get(title).map(String::as_str) == Some(region) {
            log::debug!("Enrichment already in flight: {}", title);
            return false;
        }
        log::debug!("Enrichment cache MISS: {} (region '{}')", title, region);
        self.in_flight.insert(title.to_string(), region.to_string());
        true
    }

    /// Store a response. Returns `false`, discarding it, when the claim for
    /// `title` is no longer held under `region`.
    pub fn complete(&mut self, title: &str, region: &str, enrichment: Enrichment) -> bool {
        if self.in_flight.get(title).map(String::as_str) != Some(region) {
            log::debug!("Discarding superseded enrichment for '{}' (region '{}')", title, region);
            return false;
        }
        self.in_flight.remove(title);
        self.entries.insert(title.to_string(), enrichment);
        true
    }

    /// Release a claim whose response arrived after its region was
    /// deselected, so a later selection can request it again.
    pub fn abandon(&mut self, title: &str, region: &str) {
        if self.in_flight.get(title).map(String::as_str) == Some(region) {
            self.in_flight.remove(title);
        }
    }

    /// Region currently holding the in-flight claim for `title`.
    pub fn claim(&self, title: &str) -> Option<&str> {
        self.in_flight.get(title).map(String::as_str)
    }

    pub fn is_in_flight(&self, title: &str) -> bool {
        self.in_flight.contains_key(title)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Synchronous memoized resolution.
    pub fn resolve(&mut self, lookup: &dyn TitleLookup, title: &str) -> Enrichment {
        if let Some(enrichment) = self.entries.get(title) {
            log::debug!("Enrichment cache HIT: {}", title);
            return enrichment.clone();
        }
        log::debug!("Enrichment cache MISS: {}", title);
        let enrichment = resolve_title(lookup, title);
        self.entries.insert(title.to_string(), enrichment.clone());
        enrichment
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything; called when a new dataset is loaded.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
    }
}

// =============================================================================
// Top-stats cards
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleCard {
    pub rank: usize,
    pub title: String,
    pub count: u64,
    pub image_url: String,
    pub description: String,
    /// Enrichment has been requested but not yet delivered.
    pub pending: bool,
}

impl TitleCard {
    pub fn new(ranked: &Ranked, enrichment: Option<&Enrichment>) -> Self {
        let pending = enrichment.is_none() && !ranked.placeholder;
        let fallback;
        let enrichment = match enrichment {
            Some(e) => e,
            None => {
                fallback = Enrichment::placeholder(&ranked.identity);
                &fallback
            }
        };
        TitleCard {
            rank: ranked.rank,
            title: ranked.identity.clone(),
            count: ranked.statistic,
            image_url: enrichment.image_url.clone(),
            description: enrichment.description.clone(),
            pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaterCard {
    pub rank: usize,
    pub username: String,
    pub total_entries: u64,
    pub avatar_url: String,
    pub anonymous: bool,
}

impl RaterCard {
    pub fn new(ranked: &Ranked) -> Self {
        let avatar_url = if ranked.placeholder {
            avatar_url(&format!("placeholder{}", ranked.rank - 1))
        } else {
            avatar_url(&ranked.identity)
        };
        RaterCard {
            rank: ranked.rank,
            username: ranked.identity.clone(),
            total_entries: ranked.statistic,
            avatar_url,
            anonymous: ranked.placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingLookup;

    impl TitleLookup for FailingLookup {
        fn lookup(&self, _title: &str) -> Result<Option<TitleInfo>> {
            Err(anyhow!("connection refused"))
        }
    }

    struct CountingLookup {
        calls: AtomicUsize,
        info: TitleInfo,
    }

    impl TitleLookup for CountingLookup {
        fn lookup(&self, _title: &str) -> Result<Option<TitleInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.info.clone()))
        }
    }

    fn counting(image: Option<&str>, synopsis: Option<&str>) -> CountingLookup {
        CountingLookup {
            calls: AtomicUsize::new(0),
            info: TitleInfo {
                image_url: image.map(String::from),
                synopsis: synopsis.map(String::from),
            },
        }
    }

    #[test]
    fn test_resolve_title_network_failure_unknown_title() {
        let enrichment = resolve_title(&FailingLookup, "X");
        assert_eq!(enrichment.image_url, PLACEHOLDER_IMAGE);
        assert_eq!(enrichment.description, GENERIC_DESCRIPTION);
        assert!(!enrichment.description.is_empty());
        assert!(enrichment.fallback);
    }

    #[test]
    fn test_resolve_title_failure_uses_title_fallback() {
        let enrichment = resolve_title(&FailingLookup, "Naruto");
        assert!(enrichment.description.contains("ninja"));
    }

    #[test]
    fn test_resolve_title_partial_result() {
        let lookup = counting(Some("https://img/1.jpg"), Some("   "));
        let enrichment = resolve_title(&lookup, "Death Note");
        assert_eq!(enrichment.image_url, "https://img/1.jpg");
        assert!(enrichment.description.contains("notebook"));
        assert!(enrichment.fallback);
    }

    #[test]
    fn test_resolve_title_full_result() {
        let lookup = counting(Some("https://img/2.jpg"), Some("A story."));
        let enrichment = resolve_title(&lookup, "Anything");
        assert_eq!(enrichment.description, "A story.");
        assert!(!enrichment.fallback);
    }

    #[test]
    fn test_resolve_title_offline() {
        let enrichment = resolve_title(&OfflineLookup, "Unlisted");
        assert_eq!(enrichment, Enrichment::placeholder("Unlisted"));
    }

    #[test]
    fn test_parse_jikan_response() {
        let body = r#"{"data":[{"images":{"jpg":{"image_url":"https://cdn/a.jpg"}},"synopsis":"Pirates."},{"synopsis":"second"}]}"#;
        let info = parse_jikan_response(body).unwrap().unwrap();
        assert_eq!(info.image_url.as_deref(), Some("https://cdn/a.jpg"));
        assert_eq!(info.synopsis.as_deref(), Some("Pirates."));

        assert_eq!(parse_jikan_response(r#"{"data":[]}"#).unwrap(), None);
        assert_eq!(parse_jikan_response(r#"{}"#).unwrap(), None);
        assert!(parse_jikan_response("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_search_url_encodes_title() {
        let lookup = JikanLookup::new().unwrap();
        let url = lookup.search_url("Steins;Gate 0");
        assert_eq!(url.as_str(), "https://api.jikan.moe/v4/anime?q=Steins%3BGate+0&limit=1");
    }

    #[test]
    fn test_jikan_lookup_unreachable_degrades() {
        let lookup = JikanLookup::with_endpoint("http://127.0.0.1:9/v4/anime").unwrap();
        let enrichment = resolve_title(&lookup, "Naruto");
        assert_eq!(enrichment.image_url, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_cache_memoizes_lookups() {
        let lookup = counting(Some("https://img/3.jpg"), Some("Text"));
        let mut cache = EnrichmentCache::new();
        let first = cache.resolve(&lookup, "Monster");
        let second = cache.resolve(&lookup, "Monster");
        assert_eq!(first, second);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

        cache.clear();
        cache.resolve(&lookup, "Monster");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_in_flight_claim() {
        let mut cache = EnrichmentCache::new();
        assert!(cache.begin("Bleach", "MI"));
        assert!(!cache.begin("Bleach", "MI"));
        assert!(cache.is_in_flight("Bleach"));
        assert!(cache.complete("Bleach", "MI", Enrichment::placeholder("Bleach")));
        assert!(!cache.is_in_flight("Bleach"));
        assert!(!cache.begin("Bleach", "OH"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_superseded_claim_discards_response() {
        let mut cache = EnrichmentCache::new();
        assert!(cache.begin("Monster", "MI"));
        // Selection moved to OH while the MI request was in flight
        assert!(cache.begin("Monster", "OH"));
        assert!(!cache.complete("Monster", "MI", Enrichment::placeholder("Monster")));
        assert!(cache.get("Monster").is_none());
        assert!(cache.complete("Monster", "OH", Enrichment::placeholder("Monster")));
        assert!(cache.get("Monster").is_some());
    }

    #[test]
    fn test_cache_abandon_only_matching_region() {
        let mut cache = EnrichmentCache::new();
        cache.begin("Naruto", "OH");
        cache.abandon("Naruto", "MI");
        assert!(cache.is_in_flight("Naruto"));
        cache.abandon("Naruto", "OH");
        assert!(!cache.is_in_flight("Naruto"));
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[test]
    fn test_avatar_url_deterministic() {
        assert_eq!(avatar_url("kira"), avatar_url("kira"));
        assert_eq!(avatar_url("a b&c"), format!("{}?seed=a+b%26c", AVATAR_BASE_URL));
    }

    #[test]
    fn test_cards() {
        let real = Ranked {
            rank: 1,
            identity: "Naruto".to_string(),
            statistic: 4,
            placeholder: false,
        };
        let pending = TitleCard::new(&real, None);
        assert!(pending.pending);
        assert_eq!(pending.image_url, PLACEHOLDER_IMAGE);

        let ready = TitleCard::new(&real, Some(&Enrichment::placeholder("Naruto")));
        assert!(!ready.pending);

        let padding = Ranked {
            rank: 3,
            identity: "Anonymous_3".to_string(),
            statistic: 0,
            placeholder: true,
        };
        let rater = RaterCard::new(&padding);
        assert!(rater.anonymous);
        assert_eq!(rater.avatar_url, format!("{}?seed=placeholder2", AVATAR_BASE_URL));
        assert!(!TitleCard::new(&padding, None).pending);
    }
}
