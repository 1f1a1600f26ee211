/// Best-effort IP geolocation and language inference.
///
/// Nothing in here can fail initialization: a failed lookup yields the
/// defaults in [`Enrichment::default`].
use log::debug;

use crate::config::LanguagePolicy;
use crate::http::{HttpClient, RequestOptions};
use crate::models::LocationData;

pub const UNKNOWN: &str = "unknown";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const FALLBACK_PRIMARY_LANGUAGE: &str = "en";

/// Country code to primary language.
const COUNTRY_LANGUAGES: &[(&str, &str)] = &[
    ("US", "en"),
    ("GB", "en"),
    ("CA", "en"),
    ("AU", "en"),
    ("NZ", "en"),
    ("IE", "en"),
    ("FR", "fr"),
    ("DE", "de"),
    ("AT", "de"),
    ("CH", "de"),
    ("IT", "it"),
    ("ES", "es"),
    ("PT", "pt"),
    ("BR", "pt"),
    ("NL", "nl"),
    ("BE", "nl"),
    ("TR", "tr"),
    ("RU", "ru"),
    ("UA", "uk"),
    ("JP", "ja"),
    ("CN", "zh"),
    ("TW", "zh"),
    ("HK", "zh"),
    ("KR", "ko"),
    ("AR", "es"),
    ("MX", "es"),
    ("CL", "es"),
    ("CO", "es"),
    ("PE", "es"),
    ("IN", "hi"),
    ("PL", "pl"),
    ("SE", "sv"),
    ("NO", "no"),
    ("DK", "da"),
    ("FI", "fi"),
    ("CZ", "cs"),
    ("GR", "el"),
    ("HU", "hu"),
    ("RO", "ro"),
    ("IL", "he"),
    ("SA", "ar"),
    ("AE", "ar"),
    ("EG", "ar"),
    ("TH", "th"),
    ("VN", "vi"),
    ("ID", "id"),
    ("MY", "ms"),
    ("PH", "tl"),
];

/// Primary language for a two-letter country code, if the table knows it.
pub fn primary_language(country_code: &str) -> Option<&'static str> {
    COUNTRY_LANGUAGES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(country_code))
        .map(|(_, lang)| *lang)
}

/// `<lang>-<COUNTRY>`, with `en` for countries not in the table.
pub fn language_tag(country_code: &str) -> String {
    let country = country_code.trim().to_ascii_uppercase();
    let lang = primary_language(&country).unwrap_or(FALLBACK_PRIMARY_LANGUAGE);
    format!("{lang}-{country}")
}

/// Location fields merged into the device registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub country: String,
    pub region: String,
    pub city: String,
    pub timezone: String,
    pub language: String,
}

impl Default for Enrichment {
    fn default() -> Self {
        Self {
            country: UNKNOWN.into(),
            region: UNKNOWN.into(),
            city: UNKNOWN.into(),
            timezone: DEFAULT_TIMEZONE.into(),
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn or_default(value: Option<&str>, default: &str) -> String {
    non_empty(value).unwrap_or(default).to_string()
}

impl Enrichment {
    /// Fill in from a lookup result, keeping defaults for anything missing.
    pub fn from_location(location: Option<&LocationData>, policy: LanguagePolicy) -> Self {
        let mut enrichment = Self::default();
        let Some(location) = location else {
            return enrichment;
        };

        enrichment.country = or_default(location.country.as_deref(), UNKNOWN);
        enrichment.region = or_default(location.region.as_deref(), UNKNOWN);
        enrichment.city = or_default(location.city.as_deref(), UNKNOWN);
        enrichment.timezone = or_default(location.timezone.as_deref(), DEFAULT_TIMEZONE);

        let server_language = match policy {
            LanguagePolicy::PreferServer => non_empty(location.language.as_deref()),
            LanguagePolicy::CountryMapping => None,
        };
        if let Some(language) = server_language {
            enrichment.language = language.to_string();
        } else if let Some(code) = non_empty(location.country_code.as_deref()) {
            enrichment.language = language_tag(code);
        }
        enrichment
    }
}

/// Queries the geolocation service.
#[derive(Debug, Clone)]
pub struct LocationEnricher {
    http: HttpClient,
    url: String,
    policy: LanguagePolicy,
}

impl LocationEnricher {
    pub fn new(http: HttpClient, url: impl Into<String>, policy: LanguagePolicy) -> Self {
        Self {
            http,
            url: url.into(),
            policy,
        }
    }

    /// Look up the caller's location. Any failure yields `None`.
    pub async fn fetch_location(&self) -> Option<LocationData> {
        debug!("location.fetch_location url={}", self.url);
        let options = RequestOptions::get().header("Content-Type", "application/json");
        match self.http.request::<LocationData>(&self.url, options).await {
            Ok(location) => Some(location),
            Err(e) => {
                self.http
                    .logger()
                    .log("Failed to fetch location data", Some(&e), None);
                None
            }
        }
    }

    /// Fetch and map in one step.
    pub async fn enrich(&self) -> Enrichment {
        let location = self.fetch_location().await;
        Enrichment::from_location(location.as_ref(), self.policy)
    }
}
