use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

/// Which summarization model backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Pretrained seq2seq model behind the Hugging Face Inference API.
    Inference,
    /// Offline sentence picker, no model download or network.
    Extractive,
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inference" | "huggingface" | "hf" => Ok(Backend::Inference),
            "extractive" | "simple" => Ok(Backend::Extractive),
            other => Err(AppError::ConfigError(format!(
                "Unknown SUMMARIZER_BACKEND '{other}' (expected 'inference' or 'extractive')"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub fetch_timeout: Duration,
    /// `None` leaves extracted text unbounded.
    pub max_content_chars: Option<usize>,
    pub request_timeout: Duration,
    pub backend: Backend,
    pub hf_api_token: Option<String>,
    pub hf_model: String,
    pub hf_inference_url: String,
    pub hf_hub_url: String,
    pub chunk_token_budget: usize,
    pub max_chunks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            fetch_timeout: Duration::from_secs(10),
            max_content_chars: Some(5000),
            request_timeout: Duration::from_secs(120),
            backend: Backend::Inference,
            hf_api_token: None,
            hf_model: DEFAULT_MODEL.to_string(),
            hf_inference_url: "https://api-inference.huggingface.co".to_string(),
            hf_hub_url: "https://huggingface.co".to_string(),
            chunk_token_budget: 900,
            max_chunks: 5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?,
            None => defaults.server_addr.port(),
        };
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let fetch_timeout = match var("FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("FETCH_TIMEOUT_SECS", &v)?),
            None => defaults.fetch_timeout,
        };
        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };
        let max_content_chars = match var("MAX_CONTENT_CHARS") {
            Some(v) => match parse_number("MAX_CONTENT_CHARS", &v)? {
                0 => None,
                n => Some(n as usize),
            },
            None => defaults.max_content_chars,
        };
        let backend = match var("SUMMARIZER_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.backend,
        };
        let chunk_token_budget = match var("CHUNK_TOKEN_BUDGET") {
            Some(v) => parse_positive("CHUNK_TOKEN_BUDGET", &v)?,
            None => defaults.chunk_token_budget,
        };
        let max_chunks = match var("MAX_CHUNKS") {
            Some(v) => parse_positive("MAX_CHUNKS", &v)?,
            None => defaults.max_chunks,
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            fetch_timeout,
            max_content_chars,
            request_timeout,
            backend,
            hf_api_token: var("HF_API_TOKEN"),
            hf_model: var("HF_MODEL").unwrap_or(defaults.hf_model),
            hf_inference_url: var("HF_INFERENCE_URL").unwrap_or(defaults.hf_inference_url),
            hf_hub_url: var("HF_HUB_URL").unwrap_or(defaults.hf_hub_url),
            chunk_token_budget,
            max_chunks,
        })
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {key}: {e}")))
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match parse_number(key, value)? {
        0 => Err(AppError::ConfigError(format!("{key} must be greater than zero"))),
        n => Ok(n as usize),
    }
}
