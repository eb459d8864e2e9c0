//! Rule objects for hosts that let a mod supply its own game factory instead of patching
//! methods at runtime.

use crate::game::{vanilla_is_valid_choose_name, Character};

pub trait ChooseNameRule: Send + Sync {
    fn is_valid_choose_name(&self, character: &dyn Character) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VanillaRule;

impl ChooseNameRule for VanillaRule {
    fn is_valid_choose_name(&self, character: &dyn Character) -> bool {
        vanilla_is_valid_choose_name(character)
    }
}

/// Any unnamed child of a leader may be named. Unlike the runtime postfix, this does not
/// consult the game's no-events setting.
#[derive(Clone, Copy, Debug, Default)]
pub struct NameEveryChildRule;

impl ChooseNameRule for NameEveryChildRule {
    fn is_valid_choose_name(&self, character: &dyn Character) -> bool {
        character.is_leader_child() && !character.has_name()
    }
}

/// Creates the rule objects the host consults for its characters.
pub trait GameFactory: Send + Sync {
    fn create_choose_name_rule(&self) -> Box<dyn ChooseNameRule>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VanillaGameFactory;

impl GameFactory for VanillaGameFactory {
    fn create_choose_name_rule(&self) -> Box<dyn ChooseNameRule> {
        Box::new(VanillaRule)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NameEveryChildGameFactory;

impl GameFactory for NameEveryChildGameFactory {
    fn create_choose_name_rule(&self) -> Box<dyn ChooseNameRule> {
        Box::new(NameEveryChildRule)
    }
}
