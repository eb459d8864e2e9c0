use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dependency::{sort_dependencies, Dependency, DependencyError, Dependent};

fn on() -> bool {
    true
}

fn off() -> bool {
    false
}

/// A set of extensions to activate together, in dependency order.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "profileVersion")]
pub enum ModProfile {
    #[serde(rename = "v1")]
    V1(ModProfileV1),
}

impl Default for ModProfile {
    fn default() -> Self {
        ModProfile::V1(ModProfileV1::default())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ModProfileV1 {
    /// Extensions that will be activated when the host loads.
    #[serde(default)]
    pub extensions: Vec<ExtensionRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRef {
    /// Name the extension is published under.
    pub name: String,

    /// Should this extension be activated?
    #[serde(default = "on")]
    pub enabled: bool,

    /// If this extension is not available and this value is false, activation reports it as
    /// a failure.
    #[serde(default = "off")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_before: Vec<Dependent<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_after: Vec<Dependent<String>>,
}

impl ExtensionRef {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            optional: false,
            load_before: vec![],
            load_after: vec![],
        }
    }
}

impl Dependency for ExtensionRef {
    type UniqueId = String;

    fn id(&self) -> Self::UniqueId {
        self.name.clone()
    }

    fn loads_after(&self) -> &[Dependent<Self::UniqueId>] {
        &self.load_after
    }

    fn loads_before(&self) -> &[Dependent<Self::UniqueId>] {
        &self.load_before
    }
}

impl ModProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let mut file_contents = String::new();
                let _ = file.read_to_string(&mut file_contents)?;

                toml::from_str(&file_contents).map_err(io::Error::other)
            }
            Some("json") => serde_json::from_reader(file).map_err(io::Error::other),
            ext => Err(io::Error::other(format!(
                "\"{}\" is unsupported",
                ext.unwrap_or("no file extension")
            ))),
        }
    }

    pub fn extensions(&self) -> &[ExtensionRef] {
        match self {
            ModProfile::V1(v1) => &v1.extensions,
        }
    }

    pub fn extensions_mut(&mut self) -> &mut Vec<ExtensionRef> {
        match self {
            ModProfile::V1(v1) => &mut v1.extensions,
        }
    }

    /// The enabled extensions of this profile, in the order they should be activated.
    pub fn load_order(&self) -> Result<Vec<ExtensionRef>, DependencyError<String>> {
        let enabled = self
            .extensions()
            .iter()
            .filter(|ext| ext.enabled)
            .cloned()
            .collect();

        sort_dependencies(enabled)
    }
}
