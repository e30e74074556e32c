//! Tool settings.
//!
//! Settings start from defaults, are overridden by `PARAMSTACK_*`
//! environment variables (optionally loaded from a `.env` file), and are
//! finally overridden by command-line flags.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, SettingsError};
use crate::template::{
    DEFAULT_DESCRIPTION, DEFAULT_ECS_RESTART_TIMEOUT_SECS, ECS_HANDLER_GRACE_SECS, TemplateFormat,
};

/// Environment variable overriding the template description.
pub const ENV_DESCRIPTION: &str = "PARAMSTACK_DESCRIPTION";

/// Environment variable overriding the output format.
pub const ENV_FORMAT: &str = "PARAMSTACK_FORMAT";

/// Environment variable overriding the ECS restart timeout.
pub const ENV_ECS_RESTART_TIMEOUT: &str = "PARAMSTACK_ECS_RESTART_TIMEOUT";

/// Environment variable enabling the generation timestamp.
pub const ENV_TIMESTAMP: &str = "PARAMSTACK_TIMESTAMP";

/// Largest Lambda function timeout.
const LAMBDA_MAX_TIMEOUT_SECS: u32 = 900;

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Template description.
    pub description: String,
    /// Output format.
    pub format: TemplateFormat,
    /// Time an ECS service may take to become stable after a restart.
    pub ecs_restart_timeout_secs: u32,
    /// Whether to record the generation time in the template metadata.
    pub include_timestamp: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            format: TemplateFormat::default(),
            ecs_restart_timeout_secs: DEFAULT_ECS_RESTART_TIMEOUT_SECS,
            include_timestamp: false,
        }
    }
}

impl Settings {
    /// Returns the largest accepted ECS restart timeout.
    #[must_use]
    pub const fn max_ecs_restart_timeout_secs() -> u32 {
        LAMBDA_MAX_TIMEOUT_SECS - ECS_HANDLER_GRACE_SECS
    }

    /// Loads defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an unusable value.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_overrides_from(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Applies overrides read through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unusable value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(description) = lookup(ENV_DESCRIPTION) {
            debug!("Overriding description from environment");
            self.description = description;
        }

        if let Some(format) = lookup(ENV_FORMAT) {
            debug!("Overriding format from environment");
            self.format = format
                .parse()
                .map_err(|message| SettingsError::invalid(ENV_FORMAT, message))?;
        }

        if let Some(timeout) = lookup(ENV_ECS_RESTART_TIMEOUT) {
            debug!("Overriding ECS restart timeout from environment");
            self.ecs_restart_timeout_secs = timeout.trim().parse().map_err(|_| {
                SettingsError::invalid(
                    ENV_ECS_RESTART_TIMEOUT,
                    format!("'{timeout}' is not a number of seconds"),
                )
            })?;
        }

        if let Some(flag) = lookup(ENV_TIMESTAMP) {
            debug!("Overriding timestamp flag from environment");
            self.include_timestamp = parse_flag(ENV_TIMESTAMP, &flag)?;
        }

        Ok(())
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty description or an out-of-range timeout.
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(SettingsError::invalid("description", "must not be empty").into());
        }

        if self.description.len() > 1024 {
            return Err(
                SettingsError::invalid("description", "must be at most 1024 characters").into(),
            );
        }

        let max = Self::max_ecs_restart_timeout_secs();
        if !(1..=max).contains(&self.ecs_restart_timeout_secs) {
            return Err(SettingsError::invalid(
                "ecs_restart_timeout",
                format!(
                    "{} is outside 1..={max} seconds",
                    self.ecs_restart_timeout_secs
                ),
            )
            .into());
        }

        Ok(())
    }
}

/// Loads a `.env` file from `dir` (or the working directory) if one exists.
///
/// Variables already set in the process environment are not replaced.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(dir: Option<&Path>) -> Result<()> {
    let env_path = dir.map_or_else(|| PathBuf::from(".env"), |d| d.join(".env"));

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            SettingsError::invalid(
                env_path.display().to_string(),
                format!("failed to load .env file: {e}"),
            )
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(SettingsError::invalid(name, format!("'{other}' is not a boolean")).into()),
    }
}
