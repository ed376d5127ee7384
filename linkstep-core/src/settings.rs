//! Clap-free settings for the batch pipeline.

use camino::Utf8PathBuf;
use linkstep_edit::TokenPolicy;
use linkstep_types::LoadAddress;

pub const DEFAULT_BASE: LoadAddress = LoadAddress::new(0x8040_0000);
pub const DEFAULT_STEP: LoadAddress = LoadAddress::new(0x20000);
pub const DEFAULT_BACKUP_SUFFIX: &str = ".linkstep.bak";

/// `{name}` and `{address}` are substituted per target.
pub fn default_build_command() -> Vec<String> {
    ["cargo", "build", "--bin", "{name}", "--release"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Settings for a batch run. Relative paths resolve against `project_dir`.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub project_dir: Utf8PathBuf,
    pub bin_dir: Utf8PathBuf,
    pub linker: Utf8PathBuf,

    // Address plan
    pub base: LoadAddress,
    pub step: LoadAddress,

    /// Build only these canonical names. Ordinals still come from the full listing.
    pub only: Vec<String>,

    pub token_policy: TokenPolicy,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,

    pub command: Vec<String>,
    pub report_dir: Option<Utf8PathBuf>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            project_dir: Utf8PathBuf::from("."),
            bin_dir: Utf8PathBuf::from("src/bin"),
            linker: Utf8PathBuf::from("src/linker.ld"),
            base: DEFAULT_BASE,
            step: DEFAULT_STEP,
            only: Vec::new(),
            token_policy: TokenPolicy::default(),
            backup_enabled: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            command: default_build_command(),
            report_dir: None,
        }
    }
}

impl BatchSettings {
    fn resolve(&self, p: &Utf8PathBuf) -> Utf8PathBuf {
        if p.is_absolute() {
            p.clone()
        } else {
            self.project_dir.join(p)
        }
    }

    pub fn bin_dir_path(&self) -> Utf8PathBuf {
        self.resolve(&self.bin_dir)
    }

    pub fn linker_path(&self) -> Utf8PathBuf {
        self.resolve(&self.linker)
    }

    pub fn report_dir_path(&self) -> Option<Utf8PathBuf> {
        self.report_dir.as_ref().map(|d| self.resolve(d))
    }

    pub fn backup_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}{}", self.linker_path(), self.backup_suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_user_layout() {
        let s = BatchSettings::default();
        assert_eq!(s.base.to_string(), "0x80400000");
        assert_eq!(s.step.to_string(), "0x20000");
        assert_eq!(s.bin_dir_path(), Utf8PathBuf::from("./src/bin"));
        assert_eq!(s.linker_path(), Utf8PathBuf::from("./src/linker.ld"));
        assert_eq!(
            s.backup_path(),
            Utf8PathBuf::from("./src/linker.ld.linkstep.bak")
        );
        assert_eq!(s.command.join(" "), "cargo build --bin {name} --release");
        assert!(s.report_dir_path().is_none());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let s = BatchSettings {
            project_dir: Utf8PathBuf::from("/work/user"),
            linker: Utf8PathBuf::from("/etc/linker.ld"),
            report_dir: Some(Utf8PathBuf::from("out")),
            ..BatchSettings::default()
        };
        assert_eq!(s.linker_path(), Utf8PathBuf::from("/etc/linker.ld"));
        assert_eq!(s.report_dir_path(), Some(Utf8PathBuf::from("/work/user/out")));
    }
}
