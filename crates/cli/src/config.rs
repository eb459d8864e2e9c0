use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::commands::profile::no_profile_dir;

pub mod known_paths;

pub use known_paths::KnownDirs;

#[derive(Debug, clap::Args, Serialize, Deserialize, Default, PartialEq)]
#[group(multiple = true)]
#[serde(default)]
pub struct Options {
    /// Override the path to the lineage profile directory.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::DirPath)]
    pub(crate) profile_dir: Option<Box<Path>>,

    /// Also write logs to this file.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::FilePath)]
    pub(crate) log_file: Option<Box<Path>>,

    /// Extensions that should never be activated, even when a profile enables them.
    #[clap(long = "disable", help_heading = "Configuration", value_name = "EXTENSION")]
    pub(crate) disabled_extensions: Vec<String>,

    /// Report crashes and errors. Only has an effect in builds with crash reporting support.
    #[clap(long, help_heading = "Configuration")]
    pub(crate) crash_reporting: Option<bool>,
}

pub struct Config {
    pub options: Options,
    pub known_dirs: KnownDirs,
}

impl Config {
    pub fn profile_dir(&self) -> Option<Box<Path>> {
        self.options
            .profile_dir
            .clone()
            .or_else(|| self.known_dirs.profile_dir())
    }

    pub fn is_disabled(&self, extension: &str) -> bool {
        self.options
            .disabled_extensions
            .iter()
            .any(|name| name == extension)
    }

    /// Resolves a profile argument, either a path to an existing file or the name of a profile
    /// in the profile directory.
    pub fn resolve_profile(&self, profile_name: &str) -> Result<PathBuf> {
        if let Ok(true) = fs::exists(profile_name) {
            Ok(PathBuf::from(profile_name))
        } else {
            Ok(self
                .profile_dir()
                .ok_or_else(no_profile_dir)?
                .join(format!("{profile_name}.toml")))
        }
    }
}

impl Options {
    /// Combines two sets of options, with values from `other` taking precedence.
    pub fn merge(self, other: Self) -> Self {
        let mut disabled_extensions = self.disabled_extensions;
        for name in other.disabled_extensions {
            if !disabled_extensions.contains(&name) {
                disabled_extensions.push(name);
            }
        }

        Self {
            profile_dir: other.profile_dir.or(self.profile_dir),
            log_file: other.log_file.or(self.log_file),
            disabled_extensions,
            crash_reporting: other.crash_reporting.or(self.crash_reporting),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let encoded_toml = fs::read_to_string(path)?;
        let toml = toml::from_str(&encoded_toml)?;

        Ok(toml)
    }

    /// Merges every existing file in `files`, in order. Files that cannot be read or parsed
    /// are skipped and returned alongside the merged options, so that they can be reported
    /// once logging is set up.
    pub fn from_files<P: AsRef<Path>>(
        files: impl IntoIterator<Item = P>,
    ) -> (Options, Vec<ConfigLoadError>) {
        let mut config = Options::default();
        let mut errors = vec![];

        for file in files.into_iter() {
            let path = file.as_ref();

            if !path.exists() {
                continue;
            }

            match Options::from_file(path) {
                Ok(item) => config = config.merge(item),
                Err(report) => errors.push(ConfigLoadError {
                    path: path.into(),
                    report,
                }),
            }
        }

        (config, errors)
    }
}

/// A configuration file that was skipped because it could not be loaded.
#[derive(Debug)]
pub struct ConfigLoadError {
    pub path: Box<Path>,
    pub report: Report,
}

impl ConfigLoadError {
    pub fn log(&self) {
        error!(path = ?self.path, error = ?self.report, "failed to load configuration");
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, path::Path};

    use assert_fs::prelude::{FileWriteStr, PathChild};

    use super::Options;

    #[test]
    fn later_sources_take_precedence() -> Result<(), Box<dyn Error>> {
        let temp_dir = assert_fs::TempDir::new()?;
        let system = temp_dir.child("system.toml");
        system.write_str(
            r#"
            profile_dir = "/srv/profiles"
            log_file = "/var/log/lineage.log"
            disabled_extensions = ["a"]
            "#,
        )?;
        let user = temp_dir.child("user.toml");
        user.write_str(
            r#"
            profile_dir = "/home/user/profiles"
            disabled_extensions = ["a", "b"]
            "#,
        )?;

        let (options, errors) = Options::from_files([
            system.path(),
            temp_dir.child("missing.toml").path(),
            user.path(),
        ]);

        assert!(errors.is_empty());

        assert_eq!(
            Some(Box::from(Path::new("/home/user/profiles"))),
            options.profile_dir
        );
        assert_eq!(
            Some(Box::from(Path::new("/var/log/lineage.log"))),
            options.log_file
        );
        assert_eq!(vec!["a", "b"], options.disabled_extensions);

        Ok(())
    }

    #[test]
    fn invalid_files_are_skipped_and_reported() -> Result<(), Box<dyn Error>> {
        let temp_dir = assert_fs::TempDir::new()?;
        let broken = temp_dir.child("broken.toml");
        broken.write_str("profile_dir = [")?;
        let valid = temp_dir.child("valid.toml");
        valid.write_str(r#"disabled_extensions = ["a"]"#)?;

        let (options, errors) = Options::from_files([broken.path(), valid.path()]);

        assert_eq!(vec!["a"], options.disabled_extensions);
        assert_eq!(1, errors.len());
        assert_eq!(broken.path(), &*errors[0].path);

        Ok(())
    }
}
