//! The parts of the host game's object model the rule depends on.

use lineage_mod_host::host_method;

pub trait Game {
    /// Whether the game was started with events disabled.
    fn is_no_events(&self) -> bool;
}

pub trait Character {
    /// The game this character belongs to, if it is still attached to one.
    fn game(&self) -> Option<&dyn Game>;

    /// Whether this character is a child of a player's leader.
    fn is_leader_child(&self) -> bool;

    fn is_heir(&self) -> bool;

    fn has_name(&self) -> bool;
}

host_method! {
    /// `Character.isValidChooseName()`: may the player pick a name for this character?
    pub IsValidChooseName: "Character"::"isValidChooseName" => fn(&dyn Character) -> bool;
}

/// The host's own eligibility check: only an unnamed heir may be named.
pub fn vanilla_is_valid_choose_name(character: &dyn Character) -> bool {
    let Some(game) = character.game() else {
        return false;
    };

    character.is_heir() && !character.has_name() && !game.is_no_events()
}
