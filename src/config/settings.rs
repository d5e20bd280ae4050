// src/config/settings.rs
use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "COLUMN_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/column.toml";

/// Process-wide settings. Precedence: env > TOML file > defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub naver_client_id: String,
    pub naver_client_secret: String,
    pub naver_base_url: String,
    /// "production" enables HSTS and JSON logs.
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
    pub max_request_size: usize,
    pub default_revision_attempts: u32,
    pub http_timeout_secs: u64,
    pub preview_cache_ttl_secs: u64,
    pub log_level: String,
    pub news_filter_config_path: Option<String>,
    /// "mock" swaps the model provider for a deterministic offline one.
    pub llm_test_mode: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            naver_client_id: String::new(),
            naver_client_secret: String::new(),
            naver_base_url: "https://openapi.naver.com/v1/search/news.json".to_string(),
            environment: "development".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:8000".to_string(),
                "https://localhost:3000".to_string(),
            ],
            rate_limit_per_minute: 5,
            max_request_size: 1024 * 1024,
            default_revision_attempts: 3,
            http_timeout_secs: 30,
            preview_cache_ttl_secs: 1800,
            log_level: "info".to_string(),
            news_filter_config_path: None,
            llm_test_mode: None,
        }
    }
}

impl Settings {
    /// Load from `$COLUMN_CONFIG_PATH` (must exist if set) or
    /// `config/column.toml` (optional), then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(PathBuf::from(p))?,
            Err(_) => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::load_from_file(p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_overrides(|k| env::var(k).ok())?;
        cfg.normalize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut cfg: Settings = toml::from_str(&data)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (the process env in production).
    pub fn apply_overrides<F>(&mut self, get: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set_str = |slot: &mut String, key: &str| {
            if let Some(v) = get(key) {
                *slot = v.trim().to_string();
            }
        };
        set_str(&mut self.openai_api_key, "OPENAI_API_KEY");
        set_str(&mut self.openai_model, "OPENAI_MODEL");
        set_str(&mut self.openai_base_url, "OPENAI_BASE_URL");
        set_str(&mut self.naver_client_id, "NAVER_CLIENT_ID");
        set_str(&mut self.naver_client_secret, "NAVER_CLIENT_SECRET");
        set_str(&mut self.naver_base_url, "NAVER_BASE_URL");
        set_str(&mut self.environment, "ENVIRONMENT");
        set_str(&mut self.log_level, "LOG_LEVEL");

        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("NEWS_FILTER_CONFIG_PATH") {
            self.news_filter_config_path = Some(v);
        }
        if let Some(v) = get("LLM_TEST_MODE") {
            self.llm_test_mode = Some(v.trim().to_ascii_lowercase()).filter(|s| !s.is_empty());
        }

        if let Some(v) = parse_env(&get, "RATE_LIMIT_PER_MINUTE")? {
            self.rate_limit_per_minute = v;
        }
        if let Some(v) = parse_env(&get, "MAX_REQUEST_SIZE")? {
            self.max_request_size = v;
        }
        if let Some(v) = parse_env(&get, "DEFAULT_REVISION_ATTEMPTS")? {
            self.default_revision_attempts = v;
        }
        if let Some(v) = parse_env(&get, "HTTP_TIMEOUT_SECS")? {
            self.http_timeout_secs = v;
        }
        if let Some(v) = parse_env(&get, "PREVIEW_CACHE_TTL_SECS")? {
            self.preview_cache_ttl_secs = v;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.environment = self.environment.to_ascii_lowercase();
        self.default_revision_attempts = self.default_revision_attempts.clamp(1, 5);
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = 30;
        }
    }

    /// Startup checks; failing here aborts boot.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.openai_api_key.is_empty() && !self.llm_mock_mode() {
            bail!("OPENAI_API_KEY is not set (set LLM_TEST_MODE=mock to run offline)");
        }
        if self.naver_client_id.is_empty() != self.naver_client_secret.is_empty() {
            bail!("NAVER_CLIENT_ID and NAVER_CLIENT_SECRET must be set together");
        }
        if self.rate_limit_per_minute == 0 {
            bail!("RATE_LIMIT_PER_MINUTE must be positive");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// `ALLOWED_ORIGINS="*"` opens CORS to every origin, without credentials.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    pub fn news_search_enabled(&self) -> bool {
        !self.naver_client_id.is_empty() && !self.naver_client_secret.is_empty()
    }

    pub fn llm_mock_mode(&self) -> bool {
        self.llm_test_mode.as_deref() == Some("mock")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn preview_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.preview_cache_ttl_secs)
    }
}

fn parse_env<F, T>(get: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => {
            let v = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: '{raw}'"))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let mut s = Settings::default();
        s.apply_overrides(lookup(&[
            ("OPENAI_API_KEY", " sk-test "),
            ("RATE_LIMIT_PER_MINUTE", "12"),
            ("ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ("LLM_TEST_MODE", "MOCK"),
        ]))
        .unwrap();
        assert_eq!(s.openai_api_key, "sk-test");
        assert_eq!(s.rate_limit_per_minute, 12);
        assert_eq!(s.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert!(s.llm_mock_mode());
    }

    #[test]
    fn wildcard_origin_is_recognized() {
        let mut s = Settings::default();
        assert!(!s.allows_any_origin());
        s.apply_overrides(lookup(&[("ALLOWED_ORIGINS", " * ")])).unwrap();
        assert_eq!(s.allowed_origins, vec!["*"]);
        assert!(s.allows_any_origin());
    }

    #[test]
    fn bad_number_is_an_error() {
        let mut s = Settings::default();
        let err = s
            .apply_overrides(lookup(&[("HTTP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn validate_requires_key_unless_mock() {
        let s = Settings::default();
        assert!(s.validate().is_err());

        let s = Settings {
            llm_test_mode: Some("mock".into()),
            ..Settings::default()
        };
        assert!(s.validate().is_ok());

        let s = Settings {
            openai_api_key: "k".into(),
            naver_client_id: "id-only".into(),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn file_values_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("column.toml");
        fs::write(
            &p,
            "environment = \"PRODUCTION\"\ndefault_revision_attempts = 9\nrate_limit_per_minute = 7\n",
        )
        .unwrap();
        let s = Settings::load_from_file(&p).unwrap();
        assert!(s.is_production());
        assert_eq!(s.default_revision_attempts, 5);
        assert_eq!(s.rate_limit_per_minute, 7);
        assert_eq!(s.openai_model, "gpt-4.1-mini");
    }
}
