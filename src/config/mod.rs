mod types;

pub use types::*;

use anyhow::{Context, Result};
use seqport_db::models::TableName;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./seqport.toml",
        "./config.toml",
        "~/.config/seqport/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    for table in [
        &config.export.table,
        &config.reconcile.sequence_table,
        &config.reconcile.export_table,
        &config.inventory.table,
    ] {
        TableName::new(table.as_str())?;
    }

    if config.export.primary.retries == 0 {
        anyhow::bail!("export.primary.retries must be at least 1");
    }
    if config.export.primary.timeout_secs == 0 || config.export.fallback.timeout_secs == 0 {
        anyhow::bail!("Converter timeouts cannot be 0");
    }
    if config.export.workers == 0 {
        anyhow::bail!("export.workers must be at least 1");
    }
    if !config.export.min_valid_size_mb.is_finite() || config.export.min_valid_size_mb < 0.0 {
        anyhow::bail!(
            "export.min_valid_size_mb must be a non-negative number, got {}",
            config.export.min_valid_size_mb
        );
    }
    if config.export.fallback_enabled
        && config.export.fallback.format == config.export.primary.format
    {
        tracing::warn!(
            "Fallback format equals primary format ({})",
            config.export.primary.format
        );
    }

    for root in [&config.paths.sequence_root, &config.paths.recordings_root]
        .into_iter()
        .flatten()
    {
        if !root.exists() {
            tracing::warn!("Configured root does not exist: {:?}", root);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqport_common::ContainerFormat;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("seqport.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.export.table, "seq_status");
        assert_eq!(config.export.only_value, 1);
        assert_eq!(config.export.min_valid_bytes(), 1024 * 1024);
        assert_eq!(config.reconcile.threshold_mb, 200);
        assert_eq!(config.converter.search_paths.len(), 3);

        let primary = config.export.primary.policy();
        assert_eq!(primary.format, ContainerFormat::Mp4);
        assert_eq!(primary.retries, 2);
        assert_eq!(primary.limits.timeout, Duration::from_secs(20));
        assert_eq!(primary.limits.kill_after_error_lines, 6);

        let fallback = config.export.fallback.policy();
        assert_eq!(fallback.format, ContainerFormat::Avi);
        assert_eq!(fallback.retries, 1);
        assert_eq!(fallback.limits.timeout, Duration::from_secs(40));
        assert_eq!(fallback.limits.kill_after_error_lines, 12);
    }

    #[test]
    fn test_partial_sections() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("seqport.toml");
        std::fs::write(
            &path,
            r#"
[paths]
database = "/var/lib/seqport/status.sqlite"

[converter]
path = "/opt/norpix/CLExport"
leading_args = ["--quiet"]

[export]
workers = 2
min_valid_size_mb = 0.5

[export.fallback]
retries = 3

[export.channel_labels]
"Monitor" = "Vitals"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.export.workers, 2);
        assert_eq!(config.export.min_valid_bytes(), 512 * 1024);
        assert_eq!(config.export.fallback.retries, 3);
        assert_eq!(config.export.fallback.timeout_secs, 40);
        assert_eq!(config.export.channel_labels["Monitor"], "Vitals");
        assert_eq!(config.converter.leading_args, ["--quiet"]);
        assert_eq!(config.converter.program, "CLExport");
    }

    #[test]
    fn test_rejects_bad_table_name() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("seqport.toml");
        std::fs::write(&path, "[export]\ntable = \"seq status\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_zero_retries_and_workers() {
        let mut config = Config::default();
        config.export.primary.retries = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.export.workers = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_format_is_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("seqport.toml");
        std::fs::write(&path, "[export.primary]\nformat = \"mkv\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let tmp = tempdir().unwrap();
        assert!(load_config_or_default(Some(&tmp.path().join("missing.toml"))).is_err());
    }
}
