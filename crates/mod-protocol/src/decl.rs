use std::{borrow::Cow, fmt};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::key::OverrideKey;

/// Execution order among overrides sharing a key. Lower values run first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const FIRST: Priority = Priority(0);
    pub const HIGH: Priority = Priority(200);
    pub const NORMAL: Priority = Priority(400);
    pub const LOW: Priority = Priority(600);
    pub const LAST: Priority = Priority(800);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FIRST => f.write_str("first"),
            Self::HIGH => f.write_str("high"),
            Self::NORMAL => f.write_str("normal"),
            Self::LOW => f.write_str("low"),
            Self::LAST => f.write_str("last"),
            Self(value) => write!(f, "{value}"),
        }
    }
}

/// How an override's result is folded into the running result of a dispatched call.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// The override's return value becomes the running result.
    Replace,

    /// The override only runs while the running result is falsy.
    OnlyIfFalsy,

    /// The override amends the running result it is given.
    #[default]
    Chain,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replace => "replace",
            Self::OnlyIfFalsy => "only-if-falsy",
            Self::Chain => "chain",
        })
    }
}

/// Stable identifier of the extension that registered a set of overrides.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct OwnerId(pub Cow<'static, str>);

impl OwnerId {
    pub const fn new(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<&'static str> for OwnerId {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single declared override, without its body.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct OverrideDecl {
    /// The host method this override attaches to.
    pub key: OverrideKey,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub mode: ApplyMode,

    /// Human readable name of the function implementing the override.
    pub handler: String,
}

/// Everything an extension declares, discoverable without running any host logic.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ExtensionManifest {
    pub owner: OwnerId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub overrides: Vec<OverrideDecl>,
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use super::{ApplyMode, ExtensionManifest, OverrideDecl, OwnerId, Priority};
    use crate::key::OverrideKey;

    #[test]
    fn lower_priority_sorts_first() {
        let mut priorities = vec![Priority::LAST, Priority(5), Priority::FIRST, Priority::NORMAL];
        priorities.sort();

        assert_eq!(
            vec![Priority::FIRST, Priority(5), Priority::NORMAL, Priority::LAST],
            priorities
        );
        assert_eq!(Priority::NORMAL, Priority::default());
    }

    #[test]
    fn manifest_serializes_to_json() {
        let manifest = ExtensionManifest {
            owner: OwnerId::new("com.example.names"),
            name: "names".into(),
            description: None,
            overrides: vec![OverrideDecl {
                key: OverrideKey::new("Character", "isValidChooseName"),
                priority: Priority::NORMAL,
                mode: ApplyMode::OnlyIfFalsy,
                handler: "allow_leader_children".into(),
            }],
        };

        let encoded = serde_json::to_string_pretty(&manifest).expect("manifest is serializable");

        expect![[r#"
            {
              "owner": "com.example.names",
              "name": "names",
              "overrides": [
                {
                  "key": {
                    "declaringType": "Character",
                    "method": "isValidChooseName"
                  },
                  "priority": 400,
                  "mode": "only-if-falsy",
                  "handler": "allow_leader_children"
                }
              ]
            }"#]]
        .assert_eq(&encoded);
    }

    #[test]
    fn decl_defaults_to_normal_chain() {
        let decl: OverrideDecl = toml::from_str(
            r#"
            handler = "f"
            key = { declaringType = "Character", method = "hasName" }
            "#,
        )
        .expect("valid declaration");

        assert_eq!(Priority::NORMAL, decl.priority);
        assert_eq!(ApplyMode::Chain, decl.mode);
    }
}
