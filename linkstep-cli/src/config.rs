//! Configuration file loading for linkstep.
//!
//! Discovers and loads `linkstep.toml` from the project directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use linkstep_core::TokenPolicy;
use linkstep_core::settings::{BatchSettings, DEFAULT_BACKUP_SUFFIX, default_build_command};
use linkstep_types::LoadAddress;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "linkstep.toml";

/// Top-level configuration from linkstep.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkstepConfig {
    pub layout: LayoutConfig,
    pub address: AddressConfig,
    pub build: BuildConfig,
    pub backups: BackupsConfig,
    pub report: ReportConfig,
}

/// Where the application sources and the shared linker script live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub bin_dir: Option<Utf8PathBuf>,
    pub linker: Option<Utf8PathBuf>,
}

/// An address written either as a TOML integer (`0x80400000`) or a string (`"0x8040_0000"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressValue {
    Int(u64),
    Text(LoadAddress),
}

impl From<AddressValue> for LoadAddress {
    fn from(v: AddressValue) -> Self {
        match v {
            AddressValue::Int(n) => LoadAddress::new(n),
            AddressValue::Text(a) => a,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressConfig {
    pub base: Option<AddressValue>,
    pub step: Option<AddressValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build command; `{name}` and `{address}` are substituted per target.
    pub command: Option<Vec<String>>,

    /// Refuse to build when the linker script lacks the base-address literal.
    pub require_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Whether to journal the linker script while it is patched.
    pub enabled: bool,

    /// Suffix appended to the linker script path for the journal file.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: Option<Utf8PathBuf>,
}

/// Discover the linkstep.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(project_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a linkstep.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<LinkstepConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<LinkstepConfig> {
    let config: LinkstepConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project directory, or return default if not found.
pub fn load_or_default(project_dir: &Utf8Path) -> anyhow::Result<LinkstepConfig> {
    match discover_config(project_dir) {
        Some(path) => load_config(&path),
        None => Ok(LinkstepConfig::default()),
    }
}

/// Values given on the command line. `None`/`false`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bin_dir: Option<Utf8PathBuf>,
    pub linker: Option<Utf8PathBuf>,
    pub base: Option<LoadAddress>,
    pub step: Option<LoadAddress>,
    pub only: Vec<String>,
    pub require_token: bool,
    pub no_backup: bool,
    pub report_dir: Option<Utf8PathBuf>,
    pub command: Vec<String>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: LinkstepConfig,
}

impl ConfigMerger {
    pub fn new(config: LinkstepConfig) -> Self {
        Self { config }
    }

    /// CLI values win; then the config file; then built-in defaults.
    pub fn merge(self, project_dir: &Utf8Path, cli: CliOverrides) -> BatchSettings {
        let defaults = BatchSettings::default();
        let cfg = self.config;

        let token_policy = if cli.require_token || cfg.build.require_token {
            TokenPolicy::Require
        } else {
            TokenPolicy::Warn
        };

        let command = if !cli.command.is_empty() {
            cli.command
        } else {
            cfg.build.command.unwrap_or_else(default_build_command)
        };

        BatchSettings {
            project_dir: project_dir.to_path_buf(),
            bin_dir: cli.bin_dir.or(cfg.layout.bin_dir).unwrap_or(defaults.bin_dir),
            linker: cli.linker.or(cfg.layout.linker).unwrap_or(defaults.linker),
            base: cli
                .base
                .or(cfg.address.base.map(LoadAddress::from))
                .unwrap_or(defaults.base),
            step: cli
                .step
                .or(cfg.address.step.map(LoadAddress::from))
                .unwrap_or(defaults.step),
            only: cli.only,
            token_policy,
            backup_enabled: cfg.backups.enabled && !cli.no_backup,
            backup_suffix: cfg.backups.suffix,
            command,
            report_dir: cli.report_dir.or(cfg.report.dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_example_config() {
        let contents = r#"
[layout]
bin_dir = "apps"
linker = "link/user.ld"

[address]
base = 0x80400000
step = "0x2_0000"

[build]
command = ["make", "app", "APP={name}"]
require_token = true

[backups]
enabled = false
suffix = ".bak"

[report]
dir = "target/linkstep"
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.layout.bin_dir, Some(Utf8PathBuf::from("apps")));
        assert_eq!(
            config.address.base.map(LoadAddress::from),
            Some(LoadAddress::new(0x8040_0000))
        );
        assert_eq!(
            config.address.step.map(LoadAddress::from),
            Some(LoadAddress::new(0x20000))
        );
        assert_eq!(
            config.build.command,
            Some(vec!["make".to_string(), "app".to_string(), "APP={name}".to_string()])
        );
        assert!(config.build.require_token);
        assert!(!config.backups.enabled);
        assert_eq!(config.backups.suffix, ".bak");
        assert_eq!(config.report.dir, Some(Utf8PathBuf::from("target/linkstep")));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.layout.linker.is_none());
        assert!(config.address.base.is_none());
        assert!(config.backups.enabled);
        assert_eq!(config.backups.suffix, ".linkstep.bak");
    }

    #[test]
    fn test_parse_bad_address() {
        let err = parse_config("[address]\nbase = \"0xnope\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("invalid TOML"));
    }

    #[test]
    fn test_merge_defaults() {
        let settings = ConfigMerger::new(LinkstepConfig::default())
            .merge(Utf8Path::new("."), CliOverrides::default());
        assert_eq!(settings.base.to_string(), "0x80400000");
        assert_eq!(settings.step.to_string(), "0x20000");
        assert_eq!(settings.linker, Utf8PathBuf::from("src/linker.ld"));
        assert_eq!(settings.token_policy, TokenPolicy::Warn);
        assert!(settings.backup_enabled);
        assert_eq!(settings.command, default_build_command());
    }

    #[test]
    fn test_merge_cli_overrides_config() {
        let config = parse_config(
            r#"
[address]
base = "0x1000"
step = "0x100"

[build]
command = ["make"]
"#,
        )
        .unwrap();
        let cli = CliOverrides {
            base: Some(LoadAddress::new(0x2000)),
            no_backup: true,
            require_token: true,
            command: vec!["just".to_string(), "{name}".to_string()],
            ..CliOverrides::default()
        };
        let settings = ConfigMerger::new(config).merge(Utf8Path::new("/p"), cli);

        assert_eq!(settings.base, LoadAddress::new(0x2000));
        assert_eq!(settings.step, LoadAddress::new(0x100));
        assert!(!settings.backup_enabled);
        assert_eq!(settings.token_policy, TokenPolicy::Require);
        assert_eq!(settings.command, vec!["just".to_string(), "{name}".to_string()]);
        assert_eq!(settings.project_dir, Utf8PathBuf::from("/p"));
    }

    #[test]
    fn test_config_command_used_when_cli_empty() {
        let config = parse_config("[build]\ncommand = [\"make\", \"{name}\"]\n").unwrap();
        let settings =
            ConfigMerger::new(config).merge(Utf8Path::new("."), CliOverrides::default());
        assert_eq!(
            settings.command,
            vec!["make".to_string(), "{name}".to_string()]
        );
    }

    #[test]
    fn test_discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
        assert!(load_or_default(&root).is_ok());
    }
}
