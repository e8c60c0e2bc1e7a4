//! Dayfare configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;

use crate::domain::{MealRole, PriceTier};

/// Main Dayfare configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Geocoding backend and resolution policy
    pub geocode: GeocodeConfig,

    /// Candidate source configuration
    pub candidates: CandidateConfig,

    /// Selection stage configuration
    pub selection: SelectionConfig,

    /// Itinerary building thresholds
    pub itinerary: ItineraryConfig,

    /// Run-level pipeline settings
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.itinerary.day_start >= self.itinerary.day_end {
            return Err(eyre::eyre!(
                "day-start {} must be before day-end {}",
                self.itinerary.day_start.format("%H:%M"),
                self.itinerary.day_end.format("%H:%M")
            ));
        }
        if self.itinerary.speed_kmh <= 0.0 {
            return Err(eyre::eyre!("speed-kmh must be positive"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .dayfare.yml
        let local_config = PathBuf::from(".dayfare.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/dayfare/dayfare.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dayfare").join("dayfare.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

/// Geocoding backend and resolution policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Nominatim-compatible search endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Area appended to queries that don't already mention it; also the
    /// planning area geocoded for the candidate search center
    #[serde(rename = "area-hint")]
    pub area_hint: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries per location on transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Minimum importance lead the top hit needs over the runner-up;
    /// anything closer counts as ambiguous
    #[serde(rename = "ambiguity-margin")]
    pub ambiguity_margin: f64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            area_hint: "Cambridge, England".to_string(),
            timeout_ms: 10_000,
            max_retries: 2,
            ambiguity_margin: 0.1,
        }
    }
}

/// Candidate source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Overpass API endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search radius around the area center, in meters
    #[serde(rename = "radius-m")]
    pub radius_m: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Optional cuisine filter (regex against the venue's cuisine tag)
    pub cuisine: Option<String>,

    /// Optional price tier filter
    pub price: Option<PriceTier>,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://overpass-api.de/api/interpreter".to_string(),
            radius_m: 2000,
            timeout_ms: 30_000,
            cuisine: None,
            price: None,
        }
    }
}

/// Selection stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Meal roles to fill
    pub roles: Vec<MealRole>,

    /// Choices requested per role
    #[serde(rename = "per-role")]
    pub per_role: u32,

    /// Upper bound accepted per role before the response is rejected
    #[serde(rename = "max-per-role")]
    pub max_per_role: u32,

    /// Free-text food preferences passed to the decision capability
    pub preferences: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            roles: MealRole::ALL.to_vec(),
            per_role: 1,
            max_per_role: 3,
            preferences: "casual dining with a mix of traditional British food and international cuisine".to_string(),
        }
    }
}

/// Itinerary building thresholds
///
/// Exposed as configuration rather than constants: meal length, travel
/// speed, and day bounds all change the feasibility verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraryConfig {
    /// Earliest schedulable time of day
    #[serde(rename = "day-start", with = "hhmm")]
    pub day_start: NaiveTime,

    /// Latest schedulable time of day
    #[serde(rename = "day-end", with = "hhmm")]
    pub day_end: NaiveTime,

    /// Estimated meal duration in minutes
    #[serde(rename = "meal-minutes")]
    pub meal_minutes: u32,

    /// Average travel speed for straight-line estimates, km/h
    #[serde(rename = "speed-kmh")]
    pub speed_kmh: f64,
}

impl Default for ItineraryConfig {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(9, 0, 0).expect("static time"),
            day_end: NaiveTime::from_hms_opt(22, 0, 0).expect("static time"),
            meal_minutes: 75,
            speed_kmh: 4.5,
        }
    }
}

/// Run-level pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Whole-run timeout in milliseconds
    #[serde(rename = "run-timeout-ms")]
    pub run_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { run_timeout_ms: 180_000 }
    }
}

/// Serde helper for HH:MM times in config files
mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M").map_err(serde::de::Error::custom)
    }
}
