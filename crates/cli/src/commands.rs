use clap::*;
use profile::ProfileCommands;

pub mod check;
pub mod extensions;
pub mod info;
pub mod profile;

#[derive(Subcommand, Debug)]
#[command(flatten_help = true)]
pub enum Commands {
    /// Show information on the lineage configuration and search paths.
    #[clap(disable_version_flag = true)]
    Info,

    /// List the extensions built into this binary and the overrides they declare.
    #[clap(disable_version_flag = true)]
    Extensions(extensions::ExtensionsArgs),

    #[clap(subcommand, disable_version_flag = true)]
    Profile(ProfileCommands),

    /// Activate a profile against an empty host, report what happened and deactivate it again.
    #[clap(disable_version_flag = true)]
    Check(check::CheckArgs),
}
