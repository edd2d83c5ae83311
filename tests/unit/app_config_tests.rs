/*!
 * Tests for configuration loading, overrides and validation
 */

use novellama::app_config::{Config, LogLevel};
use std::collections::HashMap;

use crate::common;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("nested").join("conf.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.max_input_tokens, 8000);
    let reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded.model_name, config.model_name);
    assert_eq!(reloaded.quality, config.quality);
}

#[test]
fn test_load_withCustomValues_shouldKeepThem() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "ko",
            "target_language": "en",
            "model_name": "gpt-4",
            "max_input_tokens": 16000,
            "max_context_chapters": 4,
            "translation_template": "To {target_language}: {source_content}",
            "database_path": "/tmp/novels.db",
            "quality": { "enabled": false, "min_good_score": 5 },
            "log_level": "warn"
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.source_language, "ko");
    assert_eq!(config.max_input_tokens, 16000);
    assert_eq!(config.max_context_chapters, 4);
    assert!(!config.quality.enabled);
    assert_eq!(config.quality.min_good_score, 5);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.resolved_database_path().unwrap().to_str(), Some("/tmp/novels.db"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_withInvalidJson_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_envOverrides_withBlankModelName_shouldKeepConfigured() {
    let env: HashMap<&str, &str> = [("MODEL_NAME", "  ")].into_iter().collect();
    let mut config = Config::default();

    config
        .apply_env_overrides_with(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.model_name, "gpt-3.5-turbo");
}

#[test]
fn test_validate_withOutOfRangeScore_shouldFail() {
    let mut config = Config::default();
    config.quality.min_good_score = 11;
    assert!(config.validate().is_err());
}

#[test]
fn test_logLevel_shouldMapToLevelFilter() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
