//! Core configuration types
//!
//! This module defines the data structures that represent a brisk.yml configuration file.
//! Every key is optional; a missing file is the same as an empty one.

use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Interpreter used to run tool commands (e.g., ["sh", "-c"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Command templates for the external tools
    pub tools: Tools,

    /// Dev server settings
    pub server: ServerConfig,

    /// Image optimization settings
    pub images: ImagesConfig,
}

/// Command templates for every external collaborator.
///
/// Templates are interpolated with `${var}` before running; see
/// `runner::command` for the variables each leaf provides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Tools {
    /// Script linter, receives `${files}`
    pub lint_scripts: String,

    /// Stylesheet linter, receives `${files}`
    pub lint_styles: String,

    /// Bundler invocation for production builds
    pub bundle_production: String,

    /// Bundler invocation for development builds
    pub bundle_development: String,

    /// Stylesheet filters, applied in order; each reads stdin and writes stdout
    pub style_stages: Vec<String>,

    /// Image optimizer, run once per changed file
    pub optimize_image: String,

    /// HTML minifier, receives `${input}` and `${output}`
    pub minify_html: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            lint_scripts: "npx eslint ${files}".to_string(),
            lint_styles: "npx stylelint --formatter verbose ${files}".to_string(),
            bundle_production:
                "npx esbuild ${entry} --bundle --minify --legal-comments=none --outfile=${output}"
                    .to_string(),
            bundle_development:
                "npx esbuild ${entry} --bundle --sourcemap --outfile=${output}".to_string(),
            style_stages: vec![
                "npx postcss --use postcss-preset-env ${map}".to_string(),
                "npx postcss --use cssnano --use postcss-reporter ${map}".to_string(),
            ],
            optimize_image: "npx imagemin ${file} --out-dir=${dir}".to_string(),
            minify_html: "npx html-minifier-terser --collapse-whitespace --remove-comments \
                          --minify-css true --minify-js true ${input} -o ${output}"
                .to_string(),
        }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Open a browser once the server is listening
    pub open: bool,

    /// Browser application to open instead of the system default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            open: true,
            browser: None,
        }
    }
}

/// Image optimization settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ImagesConfig {
    /// How many optimizer processes may run at once
    pub concurrency: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        ImagesConfig { concurrency: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.interpreter.is_none());
        assert_eq!(config.server.port, 8080);
        assert!(config.server.open);
        assert_eq!(config.images.concurrency, 4);
        assert_eq!(config.tools.style_stages.len(), 2);
    }

    #[test]
    fn test_deserialize_partial_tools() {
        let yaml = r#"
tools:
  lint-scripts: "true"
  style-stages:
    - cat
server:
  port: 3000
  open: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tools.lint_scripts, "true");
        assert_eq!(config.tools.style_stages, vec!["cat".to_string()]);
        // Untouched keys keep their defaults
        assert!(config.tools.bundle_production.contains("--minify"));
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.open);
    }

    #[test]
    fn test_misspelled_keys_are_rejected() {
        let yaml = r#"
tools:
  bundle-prodution: "esbuild ${entry}"
"#;
        let error = serde_yaml::from_str::<Config>(yaml).unwrap_err();
        assert!(error.to_string().contains("bundle-prodution"));

        assert!(serde_yaml::from_str::<Config>("sever:\n  port: 3000\n").is_err());
        assert!(serde_yaml::from_str::<Config>("images:\n  concurency: 2\n").is_err());
    }

    #[test]
    fn test_deserialize_browser() {
        let yaml = r#"
server:
  browser: google chrome
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.browser, Some("google chrome".to_string()));
        assert_eq!(config.server.port, 8080);
    }
}
