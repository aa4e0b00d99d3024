//! Configuration validation.
//!
//! Each section has its own validator; this orchestrator runs them all
//! and collects the errors into a single `ConfigError`.

mod helpers;
mod realtime;


use crate::schema::DiscussConfig;
use discuss_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DiscussConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    realtime::validate_realtime(&mut errors, config);
    realtime::validate_topics(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
