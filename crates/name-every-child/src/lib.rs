//! Lets the player name every child of their leader, not only the heir.

use lineage_mod_host::{Extension, OwnerId, Overrides};
use tracing::info;

use crate::factory::{GameFactory, NameEveryChildGameFactory};

pub mod factory;
pub mod game;
pub mod patches;

pub const OWNER: OwnerId = OwnerId::new("com.becked.nameeverychild");

#[derive(Clone, Copy, Debug, Default)]
pub struct NameEveryChild;

impl NameEveryChild {
    /// The game factory for hosts that take a replacement factory instead of patching
    /// `Character::isValidChooseName` at runtime.
    pub fn game_factory(&self) -> Box<dyn GameFactory> {
        Box::new(NameEveryChildGameFactory)
    }
}

impl Extension for NameEveryChild {
    fn owner(&self) -> OwnerId {
        OWNER
    }

    fn name(&self) -> &str {
        "name-every-child"
    }

    fn description(&self) -> Option<&str> {
        Some("Non-heir children of a leader can be given a custom name")
    }

    fn declare(&self, overrides: &mut Overrides) -> eyre::Result<()> {
        overrides.add(patches::choose_name_postfix());
        info!(owner = %OWNER, "declared name-every-child overrides");

        Ok(())
    }
}

/// Every extension this crate provides.
pub fn catalog() -> Vec<Box<dyn Extension>> {
    vec![Box::new(NameEveryChild)]
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use expect_test::expect;
    use lineage_mod_host::{Dispatcher, Extension, Loader, Registry};

    use super::{catalog, NameEveryChild, OWNER};
    use crate::game::{test_support::TestCharacter, vanilla_is_valid_choose_name, IsValidChooseName};

    #[test]
    fn manifest() {
        let manifest = NameEveryChild.manifest().unwrap();

        expect![[r#"
            {
              "owner": "com.becked.nameeverychild",
              "name": "name-every-child",
              "description": "Non-heir children of a leader can be given a custom name",
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
        .assert_eq(&serde_json::to_string_pretty(&manifest).unwrap());
    }

    #[test]
    fn game_factory_allows_leader_children() {
        let rule = NameEveryChild.game_factory().create_choose_name_rule();
        let child = TestCharacter {
            leader_child: true,
            ..TestCharacter::in_game()
        };

        assert!(rule.is_valid_choose_name(&child));
        assert!(!rule.is_valid_choose_name(&TestCharacter {
            named: true,
            ..child
        }));
    }

    #[test]
    fn activation_lifecycle() {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(registry.clone());
        let mut loader = Loader::new(registry.clone());
        let extensions = catalog();

        let report = loader
            .activate(extensions.iter().map(|extension| &**extension))
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(1, registry.count_for_owner(&OWNER));

        let child = TestCharacter {
            leader_child: true,
            ..TestCharacter::in_game()
        };
        let eligible = |dispatcher: &Dispatcher| {
            dispatcher.dispatch::<IsValidChooseName, _>(&child, &(), |character, _| {
                vanilla_is_valid_choose_name(character)
            })
        };

        assert!(eligible(&dispatcher));

        loader.deactivate();

        assert_eq!(0, registry.count_for_owner(&OWNER));
        assert!(!eligible(&dispatcher));
    }
}
