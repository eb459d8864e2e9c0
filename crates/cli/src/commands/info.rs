use crate::{config::Config, output::OutputBuilder};

fn format_path<P: AsRef<std::path::Path>>(path: Option<P>) -> String {
    match path {
        None => "<none>".to_string(),
        Some(path) => path.as_ref().to_string_lossy().to_string(),
    }
}

pub fn render(config: &Config) -> String {
    let mut output = OutputBuilder::new("Configuration");

    output.property("Profile directory", format_path(config.profile_dir()));
    output.property("Log file", format_path(config.options.log_file.as_ref()));

    output.section("Configuration search paths", |builder| {
        for (index, item) in config.known_dirs.config_dirs().enumerate() {
            builder.property(format!("{index}"), item.join("lineage.toml").to_string_lossy());
        }
    });

    output.section("Disabled extensions", |builder| {
        for name in &config.options.disabled_extensions {
            builder.item(name);
        }
    });

    output.build()
}

pub fn info(config: Config) -> color_eyre::Result<()> {
    println!("{}", render(&config));

    Ok(())
}
