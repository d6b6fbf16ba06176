//! The game runner: plays a batch of complete games between a fixed
//! seating of players, optionally spreading the rounds across a `rayon`
//! pool since each round is fully independent of every other. Every round
//! gets its own freshly built players and state, so nothing leaks between
//! rounds even when they run concurrently.

use crate::error::Result;
use crate::game::{self, Game};
use crate::player::{self, Player};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const MOVE_CAP: usize = 100_000;

/// One seat's configuration for a batch of rounds: the player type/data to
/// construct fresh for every round, whether it keeps a background search
/// running between its own turns, and how long `get_best_action` may block.
pub struct PlayerSpec {
    pub type_tag: String,
    pub data: Value,
    pub allow_background_thinking: bool,
    pub max_think_time: Option<Duration>,
}

pub struct RunGamesReport {
    pub results: Vec<Vec<f32>>,
    pub final_result: Vec<f32>,
}

pub fn run_games(
    game_type: &str,
    game_data: &Value,
    player_specs: &[PlayerSpec],
    rounds: usize,
    parallel: bool,
) -> Result<RunGamesReport> {
    let game = game::create(game_type, game_data)?;
    let player_count = game.player_count();

    let run_one = |_: usize| -> Result<Vec<f32>> { play_one_round(game.clone(), player_specs) };
    let results: Vec<Vec<f32>> = if parallel {
        use rayon::prelude::*;
        (0..rounds).into_par_iter().map(run_one).collect::<Result<_>>()?
    } else {
        (0..rounds).map(run_one).collect::<Result<_>>()?
    };

    let mut final_result = vec![0.0f32; player_count];
    for round in &results {
        for (total, &r) in final_result.iter_mut().zip(round) {
            *total += r;
        }
    }
    Ok(RunGamesReport { results, final_result })
}

fn play_one_round(game: Arc<dyn Game>, player_specs: &[PlayerSpec]) -> Result<Vec<f32>> {
    let mut state = game.create_default_state();
    let players: Vec<Box<dyn Player>> = player_specs
        .iter()
        .map(|spec| player::create(game.clone(), state.as_ref(), &spec.type_tag, &spec.data))
        .collect::<Result<_>>()?;

    for (player, spec) in players.iter().zip(player_specs) {
        if spec.allow_background_thinking {
            player.start_thinking();
        }
    }

    let mut moves = 0;
    let result = loop {
        if let Some(result) = game.terminal_result(state.as_ref()) {
            break result;
        }
        if moves >= MOVE_CAP {
            break vec![0.5; game.player_count()];
        }
        let seat = game.next_player(state.as_ref()) as usize;
        let (Some(player), Some(spec)) = (players.get(seat), player_specs.get(seat)) else {
            break vec![0.5; game.player_count()];
        };
        if !spec.allow_background_thinking {
            player.start_thinking();
        }
        let action = player.get_best_action(spec.max_think_time);
        if !spec.allow_background_thinking {
            player.stop_thinking();
        }
        let Some(action) = action else {
            break vec![0.5; game.player_count()];
        };
        moves += 1;
        let outcome = game.take_action(state.as_mut(), action.as_ref());
        for other in &players {
            other.update(action.as_ref());
        }
        if let Some(result) = outcome {
            break result;
        }
    };

    for (player, spec) in players.iter().zip(player_specs) {
        if spec.allow_background_thinking {
            player.stop_thinking();
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_spec() -> PlayerSpec {
        PlayerSpec {
            type_tag: "random_move".to_string(),
            data: Value::Null,
            allow_background_thinking: false,
            max_think_time: None,
        }
    }

    #[test]
    fn random_vs_random_always_terminates() {
        let specs = vec![random_spec(), random_spec()];
        let report = run_games("tic_tac_toe", &Value::Null, &specs, 20, false).unwrap();
        assert_eq!(report.results.len(), 20);
        assert_eq!(report.final_result.len(), 2);
    }

    #[test]
    fn parallel_rounds_match_sequential_round_count() {
        let specs = vec![random_spec(), random_spec()];
        let report = run_games("tic_tac_toe", &Value::Null, &specs, 20, true).unwrap();
        assert_eq!(report.results.len(), 20);
    }
}
