//! Process configuration, read once at startup.
//!
//! Each provider adapter receives its own section; nothing below the binary
//! looks at the environment.

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com/v1";
pub const DEFAULT_WEATHER_LANG: &str = "tr";
pub const DEFAULT_COUNTRY: &str = "Turkey";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// How the JSON object is cut out of the model's free-text reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonExtraction {
    /// Span from the first `{` to the last `}`.
    #[default]
    FirstLastBrace,
    /// Try each `{` in turn and take the first brace-balanced span that parses.
    Balanced,
}

impl JsonExtraction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first_last" | "first-last" | "" => Some(Self::FirstLastBrace),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    /// Without a key every lookup fails with `ProviderError::NotConfigured`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub photo_max_width: u32,
    pub max_photos: usize,
    pub max_reviews: usize,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_PLACES_BASE_URL.to_string(),
            photo_max_width: 800,
            max_photos: 3,
            max_reviews: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub lang: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            lang: DEFAULT_WEATHER_LANG.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub default_country: String,
    pub json_extraction: JsonExtraction,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_country: DEFAULT_COUNTRY.to_string(),
            json_extraction: JsonExtraction::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origin: Option<String>,
    pub gemini: GeminiConfig,
    pub places: PlacesConfig,
    pub weather: WeatherConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `GEMINI_MODEL`, `GEMINI_BASE_URL`
    /// - `GOOGLE_API_KEY`, `GOOGLE_PLACES_BASE_URL`
    /// - `WEATHERAPI_KEY`, `WEATHERAPI_BASE_URL`, `WEATHERAPI_LANG`
    /// - `DEFAULT_COUNTRY`, `GENERATION_JSON_EXTRACTION` (`first_last` | `balanced`)
    /// - `BIND_ADDR`, `CORS_ORIGIN`
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;

        let bind_raw = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "BIND_ADDR".to_string(),
                value: bind_raw.clone(),
            })?;

        let gemini = GeminiConfig {
            api_key: required("GEMINI_API_KEY")?,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
        };

        let places = PlacesConfig {
            api_key: optional("GOOGLE_API_KEY"),
            base_url: env::var("GOOGLE_PLACES_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PLACES_BASE_URL.to_string()),
            ..PlacesConfig::default()
        };

        let weather = WeatherConfig {
            api_key: optional("WEATHERAPI_KEY"),
            base_url: env::var("WEATHERAPI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_WEATHER_BASE_URL.to_string()),
            lang: env::var("WEATHERAPI_LANG").unwrap_or_else(|_| DEFAULT_WEATHER_LANG.to_string()),
        };

        let extraction_raw = env::var("GENERATION_JSON_EXTRACTION").unwrap_or_default();
        let json_extraction =
            JsonExtraction::parse(&extraction_raw).ok_or_else(|| ConfigError::InvalidValue {
                name: "GENERATION_JSON_EXTRACTION".to_string(),
                value: extraction_raw.clone(),
            })?;

        let planner = PlannerConfig {
            default_country: env::var("DEFAULT_COUNTRY")
                .unwrap_or_else(|_| DEFAULT_COUNTRY.to_string()),
            json_extraction,
        };

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin: optional("CORS_ORIGIN"),
            gemini,
            places,
            weather,
            planner,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    optional(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
