//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::{Config, Tools};
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() || interpreter[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name a program".to_string(),
            ));
        }
    }

    validate_tools(&config.tools)?;

    if config.server.port == 0 {
        return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
    }

    if config.images.concurrency == 0 {
        return Err(ConfigError::Invalid(
            "images.concurrency must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validate the tool command templates
pub fn validate_tools(tools: &Tools) -> ConfigResult<()> {
    let templates = [
        ("lint-scripts", &tools.lint_scripts),
        ("lint-styles", &tools.lint_styles),
        ("bundle-production", &tools.bundle_production),
        ("bundle-development", &tools.bundle_development),
        ("optimize-image", &tools.optimize_image),
        ("minify-html", &tools.minify_html),
    ];

    for (key, template) in templates {
        require_template(key, template)?;
    }

    if tools.style_stages.is_empty() {
        return Err(ConfigError::Invalid(
            "tools.style-stages must list at least one stage".to_string(),
        ));
    }
    for (index, stage) in tools.style_stages.iter().enumerate() {
        require_template(&format!("style-stages[{}]", index), stage)?;
    }

    Ok(())
}

fn require_template(key: &str, template: &str) -> ConfigResult<()> {
    if template.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "tools.{} must not be empty",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_template() {
        let mut config = Config::default();
        config.tools.minify_html = "   ".to_string();

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("minify-html")));
    }

    #[test]
    fn test_validate_empty_stage_list() {
        let mut config = Config::default();
        config.tools.style_stages.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_stage() {
        let mut config = Config::default();
        config.tools.style_stages.push(String::new());

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("style-stages[2]")));
    }

    #[test]
    fn test_validate_empty_interpreter() {
        let mut config = Config::default();
        config.interpreter = Some(vec![]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.images.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }
}
