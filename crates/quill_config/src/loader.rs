//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::QuillConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "quill.toml";

/// Loads and validates a `quill.toml` configuration from a project directory.
///
/// Reads `<project_dir>/quill.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<QuillConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `quill.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<QuillConfig, ConfigError> {
    let config: QuillConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &QuillConfig) -> Result<(), ConfigError> {
    if config.scan.sources.is_empty() {
        return Err(ConfigError::MissingField("scan.sources".to_string()));
    }
    if let Some(modules) = &config.scan.modules {
        if modules.len() != config.scan.sources.len() {
            return Err(ConfigError::ValidationError(format!(
                "scan.modules has {} entries but scan.sources has {}",
                modules.len(),
                config.scan.sources.len()
            )));
        }
    }
    if config.parallel.threads == Some(0) {
        return Err(ConfigError::ValidationError(
            "parallel.threads must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[scan]
sources = ["Sources"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scan.sources, vec!["Sources"]);
        assert!(config.scan.modules.is_none());
        assert!(!config.cache.disabled);
        assert!(!config.parallel.serial);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[scan]
sources = ["Sources/App", "Sources/Core"]
modules = ["App", "Core"]
exclude = ["Sources/App/Generated"]
force_parse = ["generated"]
parse_documentation = true

[cache]
disabled = true
base_path = ".quill-cache"

[parallel]
serial = true
threads = 4
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scan.sources.len(), 2);
        assert_eq!(
            config.scan.modules.as_deref(),
            Some(&["App".to_string(), "Core".to_string()][..])
        );
        assert_eq!(config.scan.exclude, vec!["Sources/App/Generated"]);
        assert_eq!(config.scan.force_parse, vec!["generated"]);
        assert!(config.scan.parse_documentation);
        assert!(config.cache.disabled);
        assert_eq!(config.cache.base_path.as_deref(), Some(".quill-cache"));
        assert!(config.parallel.serial);
        assert_eq!(config.parallel.threads, Some(4));
    }

    #[test]
    fn missing_sources_errors() {
        let err = load_config_from_str("[cache]\ndisabled = true").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn module_count_mismatch_errors() {
        let toml = r#"
[scan]
sources = ["A", "B"]
modules = ["OnlyOne"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("1 entries"));
    }

    #[test]
    fn zero_threads_errors() {
        let toml = r#"
[scan]
sources = ["A"]

[parallel]
threads = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let toml = "this is not valid toml {{{}}}";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[scan]\nsources = [\"Sources\"]\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.scan.sources, vec!["Sources"]);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
