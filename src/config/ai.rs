// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

fn default_model() -> String {
    // Cost-efficient default; swap for a larger model when quality matters more.
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// "openai" (case-insensitive)
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature, clamped into 0.0..=2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        // Sanitize sampling knobs
        if !(0.0..=2.0).contains(&cfg.temperature) {
            cfg.temperature = default_temperature();
        }
        if cfg.max_tokens == 0 {
            cfg.max_tokens = default_max_tokens();
        }

        Ok(cfg)
    }

    /// Environment-only wiring: OPENAI_API_KEY plus defaults. The key may be
    /// absent; the backend reports that at call time.
    pub fn from_env() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_cfg(name: &str, body: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(name);
        fs::create_dir_all(&dir).unwrap();
        let p = dir.join("ai.json");
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        p
    }

    #[serial_test::serial]
    #[test]
    fn env_indirection_resolves_the_key() {
        let p = write_cfg(
            "jpa-ai-cfg-env",
            r#"{"provider": "OpenAI", "api_key": "ENV", "temperature": 9.0}"#,
        );

        env::set_var("OPENAI_API_KEY", "sk-test-123");
        let cfg = AiConfig::load_from_file(&p).unwrap();
        env::remove_var("OPENAI_API_KEY");

        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test-123");
        assert_eq!(cfg.model, "gpt-4o-mini");
        // out-of-range temperature falls back
        assert!((cfg.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[serial_test::serial]
    #[test]
    fn missing_env_key_is_an_error() {
        let p = write_cfg(
            "jpa-ai-cfg-missing",
            r#"{"provider": "openai", "api_key": "ENV"}"#,
        );

        env::remove_var("OPENAI_API_KEY");
        assert!(AiConfig::load_from_file(&p).is_err());
    }

    #[test]
    fn literal_keys_pass_through() {
        let p = write_cfg(
            "jpa-ai-cfg-literal",
            r#"{"provider": "openai", "api_key": "sk-literal"}"#,
        );
        let cfg = AiConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.api_key, "sk-literal");
    }
}
