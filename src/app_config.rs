use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, debug};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::templates::{DEFAULT_SYSTEM_PROMPT, SOURCE_CONTENT};
use crate::context::{PromptTemplate, TranslationRequestBuilder, TruncationEngine};
use crate::quality::{LengthRatioScorer, QualityFeedbackLoop};
use crate::tokenizer::TokenizerAdapter;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default source language for new novels (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Default target language for new novels (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Model identifier, also selects the tokenizer
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Token budget for one translation request
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    /// Cap on prior chapters offered to the truncation engine, 0 for no cap
    #[serde(default)]
    pub max_context_chapters: usize,

    /// How many finished chapters are fetched as context
    #[serde(default = "default_context_chapters")]
    pub context_chapters: usize,

    /// System prompt used when a novel has none
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Task template used when a novel has none
    /// Placeholders: {source_language}, {target_language}, {source_content}
    #[serde(default)]
    pub translation_template: Option<String>,

    /// SQLite file, defaults to the platform data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub quality: QualityConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Quality feedback loop settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QualityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lowest score (0-10) still considered good quality
    #[serde(default = "default_min_good_score")]
    pub min_good_score: u8,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_good_score: default_min_good_score(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "ja".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_input_tokens() -> usize {
    8000
}

fn default_context_chapters() -> usize {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_good_score() -> u8 {
    7
}

impl Config {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Config::default();
        config.save(path)?;
        debug!("Created default config at {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create config file: {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Apply `MAX_TOKENS`, `MODEL_NAME` and `MAX_CONTEXT_MESSAGES` from the environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MAX_TOKENS") {
            self.max_input_tokens = value
                .trim()
                .parse()
                .with_context(|| format!("MAX_TOKENS is not a number: {}", value))?;
        }
        if let Some(value) = lookup("MODEL_NAME").filter(|v| !v.trim().is_empty()) {
            self.model_name = value.trim().to_string();
        }
        if let Some(value) = lookup("MAX_CONTEXT_MESSAGES") {
            self.max_context_chapters = value
                .trim()
                .parse()
                .with_context(|| format!("MAX_CONTEXT_MESSAGES is not a number: {}", value))?;
        }
        Ok(())
    }

    /// Database path from the config or the platform default
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::DatabaseConnection::default_database_path(),
        }
    }

    /// Feedback loop scoring offline with `quality.min_good_score`
    ///
    /// Disabled loops attach no check and clear the stored one on save.
    pub fn quality_loop(&self) -> QualityFeedbackLoop {
        let scorer = LengthRatioScorer::new(self.quality.min_good_score);
        QualityFeedbackLoop::new(Arc::new(scorer)).with_enabled(self.quality.enabled)
    }

    /// Request builder bounded by `max_input_tokens` and `max_context_chapters`
    pub fn request_builder(&self, tokenizer: TokenizerAdapter) -> TranslationRequestBuilder {
        TranslationRequestBuilder::new(TruncationEngine::new(tokenizer), self.max_input_tokens)
            .with_max_context_chapters(self.max_context_chapters)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if self.max_input_tokens == 0 {
            return Err(anyhow!("max_input_tokens must be greater than zero"));
        }

        if self.model_name.trim().is_empty() {
            return Err(anyhow!("model_name must not be empty"));
        }

        if let Some(template) = &self.translation_template {
            if !PromptTemplate::new(template).has_content_slot() {
                return Err(anyhow!("translation_template must contain {}", SOURCE_CONTENT));
            }
        }

        if self.quality.min_good_score > crate::quality::MAX_SCORE {
            return Err(anyhow!(
                "quality.min_good_score must be at most {}",
                crate::quality::MAX_SCORE
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            model_name: default_model_name(),
            max_input_tokens: default_max_input_tokens(),
            max_context_chapters: 0,
            context_chapters: default_context_chapters(),
            system_prompt: default_system_prompt(),
            translation_template: None,
            database_path: None,
            quality: QualityConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
