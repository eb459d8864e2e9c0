use std::{fs, path::PathBuf};

use clap::{ArgAction, Args, Subcommand};
use color_eyre::eyre::{eyre, OptionExt};
use lineage_mod_protocol::{ExtensionRef, ModProfile};
use tracing::{debug, warn};

use crate::{config::Config, output::OutputBuilder};

#[derive(Subcommand, Debug)]
#[command(flatten_help = true)]
pub enum ProfileCommands {
    /// Create a new profile with the given name.
    Create(ProfileCreateArgs),

    /// List all profiles stored in the profile directory.
    List,

    /// Show information on a profile identified by a name or path.
    #[clap(name = "show")]
    Show { name: String },
}

#[derive(Args, Debug)]
pub struct ProfileCreateArgs {
    /// Name of the profile.
    name: String,

    /// Extensions to enable in the new profile.
    #[clap(short, long = "extension", value_name = "EXTENSION")]
    extensions: Vec<String>,

    /// Treat the name as a filename instead of a profile to store in the profile directory.
    #[clap(short, long, action = ArgAction::SetTrue)]
    file: bool,

    /// Overwrite the profile if it already exists.
    #[clap(long, action = ArgAction::SetTrue)]
    overwrite: bool,
}

#[tracing::instrument(skip_all)]
pub fn list(config: Config) -> color_eyre::Result<()> {
    let profile_dir = config.profile_dir().ok_or_else(no_profile_dir)?;

    debug!("searching in {profile_dir:?} for profiles");

    if !fs::exists(&profile_dir)? {
        debug!("profile dir doesn't exist, no profiles");
        return Ok(());
    }

    for profile_entry in fs::read_dir(profile_dir)? {
        match profile_entry {
            Ok(profile) => println!("{}", profile.file_name().to_string_lossy()),
            Err(e) => warn!(?e, "unable to read entry"),
        }
    }

    Ok(())
}

#[tracing::instrument(skip(config))]
pub fn create(config: Config, args: ProfileCreateArgs) -> color_eyre::Result<()> {
    let profile_path = if args.file {
        PathBuf::from(&args.name)
    } else {
        config.resolve_profile(&args.name)?
    };

    if fs::exists(&profile_path)? && !args.overwrite {
        return Err(eyre!(
            "Profile already exists, use --overwrite to ignore this error"
        ));
    }

    let profile_dir = profile_path
        .parent()
        .ok_or_eyre("profile parent path was removed")?;
    fs::create_dir_all(profile_dir)?;

    let mut profile = ModProfile::default();
    profile
        .extensions_mut()
        .extend(args.extensions.into_iter().map(ExtensionRef::new));

    fs::write(&profile_path, toml::to_string_pretty(&profile)?)?;
    debug!(?profile_path, "created profile");

    Ok(())
}

pub fn render(name: &str, path: &str, profile: &ModProfile) -> String {
    let mut output = OutputBuilder::new("Mod Profile");

    output.property("Name", name);
    output.property("Path", path);

    output.section("Extensions", |builder| {
        for extension in profile.extensions() {
            builder.section(&extension.name, |builder| {
                builder.property("Enabled", extension.enabled);
                builder.property("Optional", extension.optional);

                for dependency in &extension.load_after {
                    builder.item(format!("loads after {}", dependency.id()));
                }

                for dependency in &extension.load_before {
                    builder.item(format!("loads before {}", dependency.id()));
                }
            });
        }
    });

    output.build()
}

#[tracing::instrument(skip(config))]
pub fn show(config: Config, name: String) -> color_eyre::Result<()> {
    let profile_path = config.resolve_profile(&name)?;

    if !fs::exists(&profile_path)? {
        return Err(eyre!("No profile found with this name"));
    }

    let profile = ModProfile::from_file(&profile_path)?;

    println!(
        "{}",
        render(&name, &profile_path.to_string_lossy(), &profile)
    );

    Ok(())
}

pub fn no_profile_dir() -> color_eyre::Report {
    eyre!(
        r#"No profile directory was configured and the default profile directory was inaccessible.

        To set a profile directory either provide `--profile-dir` on the command line or set `profile_dir`
        in a lineage configuration file. Use `lineage info` to find out where lineage searches for your configuration files.
    "#
    )
}
