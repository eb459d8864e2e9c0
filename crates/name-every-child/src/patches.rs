use lineage_mod_host::{ApplyMode, DispatchContext, OverrideEntry, Priority};
use tracing::trace;

use crate::game::IsValidChooseName;

/// Postfix for [`IsValidChooseName`]: a leader's unnamed children may be named even when they
/// are not the heir. Every other condition of the host's own check still applies.
pub fn allow_leader_children(
    context: &DispatchContext<'_, IsValidChooseName>,
    current: &bool,
) -> eyre::Result<bool> {
    if *current {
        return Ok(true);
    }

    let character = context.receiver();

    // Characters can outlive their game while the host tears a session down.
    let Some(game) = character.game() else {
        trace!("character has no game, keeping host result");
        return Ok(false);
    };

    Ok(character.is_leader_child() && !character.has_name() && !game.is_no_events())
}

pub fn choose_name_postfix() -> OverrideEntry<IsValidChooseName> {
    OverrideEntry::from_fn("allow_leader_children", allow_leader_children)
        .with_mode(ApplyMode::OnlyIfFalsy)
        .with_priority(Priority::NORMAL)
}
