// tests/config_env.rs
//
// Settings::load precedence (file < env) and the news filter loader.
// These touch process env vars, so they run serially.

use std::{env, fs};

use serial_test::serial;

use column_forge::config::settings::ENV_CONFIG_PATH;
use column_forge::config::{NewsFilterConfig, Settings};

const KEYS: &[&str] = &[
    ENV_CONFIG_PATH,
    "OPENAI_MODEL",
    "RATE_LIMIT_PER_MINUTE",
    "ENVIRONMENT",
    "PREVIEW_CACHE_TTL_SECS",
];

fn clear() {
    for k in KEYS {
        env::remove_var(k);
    }
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("column.toml");
    fs::write(
        &p,
        "openai_model = \"file-model\"\nrate_limit_per_minute = 9\npreview_cache_ttl_secs = 60\n",
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, &p);
    env::set_var("RATE_LIMIT_PER_MINUTE", "3");
    env::set_var("ENVIRONMENT", "Production");

    let s = Settings::load().expect("load settings");
    assert_eq!(s.openai_model, "file-model");
    assert_eq!(s.rate_limit_per_minute, 3);
    assert_eq!(s.preview_cache_ttl_secs, 60);
    assert!(s.is_production());

    clear();
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    clear();
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/column.toml");
    assert!(Settings::load().is_err());
    clear();
}

#[test]
#[serial]
fn news_filter_loads_json_and_toml() {
    let dir = tempfile::tempdir().unwrap();

    let j = dir.path().join("filter.json");
    fs::write(
        &j,
        r#"{ "generic_term": "politics", "vocabulary": [" Senate ", "senate", ""],
             "expansions": [{ "keyword": "PM", "expanded": "prime minister" }] }"#,
    )
    .unwrap();
    let cfg = NewsFilterConfig::load_from(&j).unwrap();
    assert_eq!(cfg.vocabulary, vec!["senate"]);
    assert_eq!(cfg.expansions[0].expanded, "prime minister");

    let t = dir.path().join("filter.toml");
    fs::write(&t, "generic_term = \"politics\"\ncontext_terms = [\"vote\"]\n").unwrap();
    let cfg = NewsFilterConfig::load_from(&t).unwrap();
    assert_eq!(cfg.context_terms, vec!["vote"]);

    assert!(NewsFilterConfig::load_default(Some("/nope/filter.toml")).is_err());
}
