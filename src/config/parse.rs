//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{BriskError, ConfigError, ConfigResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["brisk.yml", "brisk.yaml"];

/// Find the configuration file by searching `start_dir` and its parents
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, BriskError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, BriskError> {
    // An empty document deserializes to unit, not a mapping
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load the project configuration and work out the project root.
///
/// An explicit file wins; otherwise `brisk.yml` is searched upward from
/// `start_dir` (or the current directory). The root is the directory holding
/// the config file. Without any config file the defaults apply and the start
/// directory is the root.
pub fn load_project(
    start_dir: Option<PathBuf>,
    file: Option<PathBuf>,
) -> Result<(Config, PathBuf), BriskError> {
    let start_dir = match start_dir {
        Some(dir) => dir,
        None => current_dir()?,
    };

    if let Some(path) = file {
        let path = if path.is_relative() {
            start_dir.join(path)
        } else {
            path
        };
        let config = parse_config_file(&path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start_dir.clone());
        return Ok((config, root));
    }

    match find_config_file_from(start_dir.clone()) {
        Ok(path) => {
            let config = parse_config_file(&path)?;
            let root = path.parent().map(Path::to_path_buf).unwrap_or(start_dir);
            Ok((config, root))
        }
        Err(ConfigError::NotFound(_)) => Ok((Config::default(), start_dir)),
        Err(e) => Err(e.into()),
    }
}

fn current_dir() -> ConfigResult<PathBuf> {
    env::current_dir()
        .map_err(|e| ConfigError::Invalid(format!("Failed to get current directory: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
server:
  port: 9000
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("brisk.yml");
        fs::write(&config_path, "server:\n  open: false\n").unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("brisk.yaml");
        let sub_dir = temp_dir.path().join("styles");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&config_path, "{}\n").unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_load_project_uses_config_dir_as_root() {
        let temp_dir = TempDir::new().unwrap();
        let sub_dir = temp_dir.path().join("scripts");
        fs::create_dir(&sub_dir).unwrap();
        fs::write(temp_dir.path().join("brisk.yml"), "server:\n  port: 4000\n").unwrap();

        let (config, root) = load_project(Some(sub_dir), None).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(root, temp_dir.path());
    }

    #[test]
    fn test_load_project_with_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("custom.yml"), "images:\n  concurrency: 1\n").unwrap();

        let (config, root) = load_project(
            Some(temp_dir.path().to_path_buf()),
            Some(PathBuf::from("custom.yml")),
        )
        .unwrap();
        assert_eq!(config.images.concurrency, 1);
        assert_eq!(root, temp_dir.path());
    }

    #[test]
    fn test_load_project_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_project(
            Some(temp_dir.path().to_path_buf()),
            Some(PathBuf::from("nope.yml")),
        );
        assert!(matches!(
            result,
            Err(BriskError::Config(ConfigError::Invalid(_)))
        ));
    }
}
