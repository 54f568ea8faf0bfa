//! The reducer: single entry point for all state mutation.
//!
//! [`apply_action`] validates an action against the current phase and combat
//! state, applies it to a clone of the prior state, and returns the new
//! state together with the ordered event list. Failed validation never
//! mutates anything the caller can observe; the input state is untouched on
//! both paths.

mod camps;
mod combat;
mod error;
mod mobilize;
mod movement;
mod phase;
mod purchase;

pub use error::ActionError;

pub(crate) use combat::territory_is_friendly_for_retreat;

use crate::action::{Action, ActionKind};
use crate::defs::Definitions;
use crate::event::GameEvent;
use crate::state::{GameState, Phase};

/// Applies a single action, returning the next state and the events that
/// describe the transition.
///
/// Outer guards run first: a finished game rejects everything, and the
/// acting faction must be the current one. The per-phase allow-list and the
/// combat-lock rules follow, then the action-specific handler.
pub fn apply_action(
    state: &GameState,
    action: &Action,
    defs: &Definitions,
) -> Result<(GameState, Vec<GameEvent>), ActionError> {
    if let Some(winner) = &state.winner {
        return Err(ActionError::GameOver {
            winner: winner.clone(),
        });
    }
    if action.faction != state.current_faction {
        return Err(ActionError::NotYourTurn {
            faction: action.faction.clone(),
            current: state.current_faction.clone(),
        });
    }
    validate_for_phase(&action.kind, state)?;

    let mut next = state.clone();
    let mut events = Vec::new();

    match &action.kind {
        ActionKind::PurchaseUnits { purchases } => {
            purchase::purchase_units(&mut next, &action.faction, purchases, defs, &mut events)?;
        }
        ActionKind::PurchaseCamp {} => {
            camps::purchase_camp(&mut next, &action.faction, defs, &mut events)?;
        }
        ActionKind::PlaceCamp {
            camp_index,
            territory_id,
        } => {
            camps::place_camp(&mut next, *camp_index, territory_id, defs)?;
        }
        ActionKind::MoveUnits {
            from,
            to,
            unit_instance_ids,
            charge_through,
        } => {
            movement::move_units(
                &mut next,
                &action.faction,
                from,
                to,
                unit_instance_ids,
                charge_through,
                defs,
                &mut events,
            )?;
        }
        ActionKind::CancelMove { move_index } => {
            movement::cancel_move(&mut next, *move_index, &mut events)?;
        }
        ActionKind::InitiateCombat {
            territory_id,
            dice_rolls,
        } => {
            combat::initiate_combat(
                &mut next,
                &action.faction,
                territory_id,
                dice_rolls,
                defs,
                &mut events,
            )?;
        }
        ActionKind::ContinueCombat { dice_rolls } => {
            combat::continue_combat(&mut next, dice_rolls, defs, &mut events)?;
        }
        ActionKind::Retreat { retreat_to } => {
            combat::retreat(&mut next, retreat_to, defs, &mut events)?;
        }
        ActionKind::MobilizeUnits { destination, units } => {
            mobilize::mobilize_units(&mut next, &action.faction, destination, units, defs)?;
        }
        ActionKind::CancelMobilization { mobilization_index } => {
            mobilize::cancel_mobilization(&mut next, *mobilization_index, &mut events)?;
        }
        ActionKind::EndPhase {} => {
            phase::end_phase(&mut next, defs, &mut events)?;
        }
        ActionKind::EndTurn {} => {
            phase::end_turn(&mut next, defs, &mut events)?;
        }
    }

    Ok((next, events))
}

/// Per-phase allow-list plus the combat-lock rules: with an active combat
/// only `continue_combat`/`retreat` pass, without one those two are
/// rejected.
fn validate_for_phase(kind: &ActionKind, state: &GameState) -> Result<(), ActionError> {
    let allowed = matches!(
        (state.phase, kind),
        (
            Phase::Purchase,
            ActionKind::PurchaseUnits { .. } | ActionKind::PurchaseCamp {} | ActionKind::EndPhase {}
        ) | (
            Phase::CombatMove | Phase::NonCombatMove,
            ActionKind::MoveUnits { .. } | ActionKind::CancelMove { .. } | ActionKind::EndPhase {}
        ) | (
            Phase::Combat,
            ActionKind::InitiateCombat { .. }
                | ActionKind::ContinueCombat { .. }
                | ActionKind::Retreat { .. }
                | ActionKind::EndPhase {}
        ) | (
            Phase::Mobilization,
            ActionKind::MobilizeUnits { .. }
                | ActionKind::PlaceCamp { .. }
                | ActionKind::CancelMobilization { .. }
                | ActionKind::EndPhase {}
                | ActionKind::EndTurn {}
        )
    );
    if !allowed {
        return Err(ActionError::PhaseNotAllowed {
            action: kind.name().to_owned(),
            phase: state.phase,
        });
    }

    if state.phase == Phase::Combat {
        let is_combat_continuation = matches!(
            kind,
            ActionKind::ContinueCombat { .. } | ActionKind::Retreat { .. }
        );
        if state.active_combat.is_some() && !is_combat_continuation {
            return Err(ActionError::CombatInProgress {
                action: kind.name().to_owned(),
            });
        }
        if state.active_combat.is_none() && is_combat_continuation {
            return Err(ActionError::NoActiveCombat {
                action: kind.name().to_owned(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActiveCombat;

    #[test]
    fn finished_games_reject_all_actions() {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        state.winner = Some("good".to_owned());
        let err = apply_action(&state, &Action::end_phase("gondor"), &Definitions::default())
            .unwrap_err();
        assert!(matches!(err, ActionError::GameOver { .. }));
    }

    #[test]
    fn only_the_current_faction_may_act() {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        let err = apply_action(&state, &Action::end_phase("mordor"), &Definitions::default())
            .unwrap_err();
        assert!(matches!(err, ActionError::NotYourTurn { .. }));
    }

    #[test]
    fn phase_allow_list_rejects_out_of_phase_actions() {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        state.phase = Phase::Purchase;
        let action = Action::move_units("gondor", "a", "b", vec!["gondor_x_001".to_owned()]);
        let err = apply_action(&state, &action, &Definitions::default()).unwrap_err();
        assert!(matches!(err, ActionError::PhaseNotAllowed { .. }));
    }

    #[test]
    fn active_combat_locks_the_phase_to_continue_or_retreat() {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        state.phase = Phase::Combat;
        state.active_combat = Some(ActiveCombat {
            attacker_faction: "gondor".to_owned(),
            territory_id: "mordor".to_owned(),
            attacker_instance_ids: Vec::new(),
            round_number: 1,
            combat_log: Vec::new(),
            attackers_have_rolled: true,
        });

        let err = apply_action(&state, &Action::end_phase("gondor"), &Definitions::default())
            .unwrap_err();
        assert!(matches!(err, ActionError::CombatInProgress { .. }));

        state.active_combat = None;
        let err = apply_action(
            &state,
            &Action::retreat("gondor", "ithilien"),
            &Definitions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ActionError::NoActiveCombat { .. }));
    }

    #[test]
    fn failed_actions_leave_the_input_state_untouched() {
        let mut state = GameState::default();
        state.current_faction = "gondor".to_owned();
        state.phase = Phase::Purchase;
        let before = state.clone();
        let action = Action::purchase_units(
            "gondor",
            std::collections::BTreeMap::from([("ghost_unit".to_owned(), 1)]),
        );
        let _ = apply_action(&state, &action, &Definitions::default()).unwrap_err();
        assert_eq!(state, before);
    }
}
