use clap::{ArgAction, Args};
use lineage_mod_host::Extension;
use lineage_mod_protocol::ExtensionManifest;

use crate::output::OutputBuilder;

#[derive(Args, Debug)]
pub struct ExtensionsArgs {
    /// Print the manifests as JSON instead of a summary.
    #[clap(long, action = ArgAction::SetTrue)]
    json: bool,
}

pub fn manifests(extensions: &[Box<dyn Extension>]) -> color_eyre::Result<Vec<ExtensionManifest>> {
    extensions
        .iter()
        .map(|extension| extension.manifest())
        .collect()
}

pub fn render(manifests: &[ExtensionManifest]) -> String {
    let mut output = OutputBuilder::new("Extensions");

    for manifest in manifests {
        output.section(&manifest.name, |builder| {
            builder.property("Owner", &manifest.owner);

            if let Some(description) = &manifest.description {
                builder.property("Description", description);
            }

            for decl in &manifest.overrides {
                builder.item(format!(
                    "{} ({}, priority {}) via {}",
                    decl.key, decl.mode, decl.priority, decl.handler
                ));
            }
        });
    }

    output.build()
}

#[tracing::instrument(skip_all)]
pub fn list(args: ExtensionsArgs) -> color_eyre::Result<()> {
    let manifests = manifests(&name_every_child::catalog())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifests)?);
    } else {
        println!("{}", render(&manifests));
    }

    Ok(())
}
