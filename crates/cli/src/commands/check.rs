use clap::Args;
use color_eyre::eyre::eyre;
use lineage_mod_host::{Extension, ModHost, OverrideKey, OwnerId};
use lineage_mod_protocol::ModProfile;
use tracing::{debug, info, warn};

use crate::{config::Config, output::OutputBuilder};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Name of a profile in the profile directory, or a path to a profile file.
    profile: String,
}

/// What happened when a profile was activated against an empty host.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub load_order: Vec<String>,
    pub skipped: Vec<String>,
    pub activated: Vec<OwnerId>,
    pub failures: Vec<String>,
    pub overrides: Vec<KeyOutcome>,
    pub removed: usize,
}

/// The overrides one key held after activation, and how many of them were retracted.
#[derive(Debug)]
pub struct KeyOutcome {
    pub key: OverrideKey,
    pub entries: Vec<String>,
    pub removed: usize,
}

impl CheckOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Activates the enabled extensions of `profile` in load order on a fresh host, records the
/// resulting registry and deactivates again.
pub fn check_profile(
    config: &Config,
    profile: &ModProfile,
    catalog: &[Box<dyn Extension>],
) -> color_eyre::Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();
    let mut selected: Vec<&dyn Extension> = vec![];

    for extension_ref in profile.load_order()? {
        if config.is_disabled(&extension_ref.name) {
            info!(extension = %extension_ref.name, "extension disabled by configuration");
            outcome.skipped.push(extension_ref.name);
            continue;
        }

        match catalog
            .iter()
            .find(|extension| extension.name() == extension_ref.name)
        {
            Some(extension) => {
                outcome.load_order.push(extension_ref.name);
                selected.push(&**extension);
            }
            None if extension_ref.optional => {
                debug!(extension = %extension_ref.name, "optional extension is not available");
                outcome.skipped.push(extension_ref.name);
            }
            None => {
                warn!(extension = %extension_ref.name, "extension is not available");
                outcome
                    .failures
                    .push(format!("{} is not available", extension_ref.name));
            }
        }
    }

    let mut host = ModHost::new();
    let report = host.activate(selected)?;

    outcome.activated = report.activated;
    outcome
        .failures
        .extend(report.failed.iter().map(ToString::to_string));

    let registry = host.registry().clone();
    let owners = host.loader().owners().to_vec();

    // Keys are retracted one at a time, deactivation then removes whatever is left.
    for key in registry.keys() {
        let entries = registry
            .lookup(&key)
            .iter()
            .map(|entry| {
                format!(
                    "{} from {} ({}, priority {})",
                    entry.handler(),
                    entry.owner(),
                    entry.mode(),
                    entry.priority()
                )
            })
            .collect();

        let removed = owners
            .iter()
            .map(|owner| registry.unregister(owner, &key))
            .sum();

        outcome.removed += removed;
        outcome.overrides.push(KeyOutcome {
            key,
            entries,
            removed,
        });
    }

    outcome.removed += host.deactivate();

    if !registry.is_empty() {
        warn!(remaining = registry.len(), "overrides left behind after deactivation");
        outcome
            .failures
            .push(format!("{} overrides were left registered", registry.len()));
    }

    Ok(outcome)
}

pub fn render(profile_name: &str, outcome: &CheckOutcome) -> String {
    let mut output = OutputBuilder::new(format!("Check {profile_name}"));

    output.property("Activated", outcome.activated.len());
    output.property("Failed", outcome.failures.len());
    output.property("Removed on unload", outcome.removed);

    output.section("Load order", |builder| {
        for name in &outcome.load_order {
            builder.item(name);
        }
    });

    if !outcome.skipped.is_empty() {
        output.section("Skipped", |builder| {
            for name in &outcome.skipped {
                builder.item(name);
            }
        });
    }

    output.section("Overrides", |builder| {
        for key_outcome in &outcome.overrides {
            builder.section(key_outcome.key.to_string(), |builder| {
                builder.property("Removed", key_outcome.removed);

                for entry in &key_outcome.entries {
                    builder.item(entry);
                }
            });
        }
    });

    if !outcome.is_success() {
        output.section("Failures", |builder| {
            for failure in &outcome.failures {
                builder.item(failure);
            }
        });
    }

    output.build()
}

#[tracing::instrument(skip(config))]
pub fn check(config: Config, args: CheckArgs) -> color_eyre::Result<()> {
    let profile_path = config.resolve_profile(&args.profile)?;
    let profile = ModProfile::from_file(&profile_path)?;
    let outcome = check_profile(&config, &profile, &name_every_child::catalog())?;

    println!("{}", render(&args.profile, &outcome));

    if outcome.is_success() {
        Ok(())
    } else {
        Err(eyre!(
            "{} extension(s) could not be activated",
            outcome.failures.len()
        ))
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use assert_fs::prelude::{FileWriteStr, PathChild};
    use expect_test::expect;
    use lineage_mod_protocol::ModProfile;

    use super::{check_profile, render};
    use crate::config::{Config, KnownDirs, Options};

    fn config(disabled: &[&str]) -> Config {
        Config {
            options: Options {
                disabled_extensions: disabled.iter().map(|name| name.to_string()).collect(),
                ..Default::default()
            },
            known_dirs: KnownDirs::default(),
        }
    }

    fn profile(contents: &str) -> Result<ModProfile, Box<dyn Error>> {
        let temp_dir = assert_fs::TempDir::new()?;
        let file = temp_dir.child("check.toml");
        file.write_str(contents)?;

        Ok(ModProfile::from_file(file.path())?)
    }

    #[test]
    fn activates_and_deactivates_builtin_extension() -> Result<(), Box<dyn Error>> {
        let profile = profile(
            r#"
            profileVersion = "v1"

            [[extensions]]
            name = "name-every-child"

            [[extensions]]
            name = "heir-tweaks"
            optional = true
            loadBefore = ["name-every-child"]
            "#,
        )?;

        let outcome = check_profile(&config(&[]), &profile, &name_every_child::catalog())?;

        assert!(outcome.is_success());
        assert_eq!(1, outcome.removed);
        assert_eq!(1, outcome.overrides[0].removed);

        expect![[r#"
            ● Check names
                        Activated: 1
                           Failed: 0
                Removed on unload: 1
              ● Load order
                  - name-every-child
              ● Skipped
                  - heir-tweaks
              ● Overrides
                ● Character::isValidChooseName
                    Removed: 1
                    - allow_leader_children from com.becked.nameeverychild (only-if-falsy, priority normal)
        "#]]
        .assert_eq(&render("names", &outcome));

        Ok(())
    }

    #[test]
    fn missing_required_extension_fails() -> Result<(), Box<dyn Error>> {
        let profile = profile(
            r#"
            profileVersion = "v1"

            [[extensions]]
            name = "name-every-child"

            [[extensions]]
            name = "heir-tweaks"
            "#,
        )?;

        let outcome = check_profile(&config(&[]), &profile, &name_every_child::catalog())?;

        assert!(!outcome.is_success());
        assert_eq!(vec!["heir-tweaks is not available"], outcome.failures);
        assert_eq!(1, outcome.activated.len());

        Ok(())
    }

    #[test]
    fn disabled_extensions_are_skipped() -> Result<(), Box<dyn Error>> {
        let profile = profile(
            r#"
            profileVersion = "v1"

            [[extensions]]
            name = "name-every-child"
            "#,
        )?;

        let outcome = check_profile(
            &config(&["name-every-child"]),
            &profile,
            &name_every_child::catalog(),
        )?;

        assert!(outcome.is_success());
        assert!(outcome.activated.is_empty());
        assert!(outcome.overrides.is_empty());
        assert_eq!(vec!["name-every-child"], outcome.skipped);
        assert_eq!(0, outcome.removed);

        Ok(())
    }
}
