//! The concurrent Game -> State -> {Player, ActionGenerator} registry.
//! Deleting a game cascades: every state registered under it, and every
//! player/generator registered under those states, is dropped with it.

mod concurrent_map;

pub use concurrent_map::ConcurrentIdMap;

use crate::actiongen::{ActionGenerator, AgData};
use crate::error::{Result, ServiceError};
use crate::game::{Action, Game, State};
use crate::player::Player;
use crate::{actiongen, game, player};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub struct TakeActionOutcome {
    pub state_json: Value,
    pub next_player: u8,
    pub result: Option<Vec<f32>>,
}

/// A registered action generator alongside the incremental data it carries,
/// kept in lockstep with the state it was created against: every committed
/// action folds into `data` the same pass that folds into the state itself.
pub struct GeneratorEntry {
    generator: Box<dyn ActionGenerator>,
    data: Mutex<Box<dyn AgData>>,
}

impl GeneratorEntry {
    fn update(&self, action: &dyn Action) {
        let mut data = self.data.lock().expect("registry lock poisoned");
        self.generator.update(data.as_mut(), action);
    }
}

pub struct StateEntry {
    state: Box<dyn State>,
    players: ConcurrentIdMap<Box<dyn Player>>,
    generators: ConcurrentIdMap<GeneratorEntry>,
}

struct GameEntry {
    game: Arc<dyn Game>,
    states: ConcurrentIdMap<StateEntry>,
}

#[derive(Default)]
pub struct Registry {
    games: ConcurrentIdMap<GameEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_game(&self, type_tag: &str, data: &Value) -> Result<u32> {
        let game = game::create(type_tag, data)?;
        Ok(self.games.insert(GameEntry {
            game,
            states: ConcurrentIdMap::new(),
        }))
    }

    pub fn delete_game(&self, game_id: u32) -> Result<()> {
        self.games
            .erase(game_id)
            .map(|_| ())
            .ok_or(ServiceError::UnknownId(game_id))
    }

    pub fn game(&self, game_id: u32) -> Result<Arc<dyn Game>> {
        self.games
            .access(game_id, |entry| entry.game.clone())
            .ok_or(ServiceError::UnknownId(game_id))
    }

    pub fn create_state(&self, game_id: u32, data: Option<&Value>) -> Result<u32> {
        self.games
            .access(game_id, |entry| {
                let state = match data {
                    Some(data) => entry.game.create_state(data)?,
                    None => entry.game.create_default_state(),
                };
                Ok(entry.states.insert(StateEntry {
                    state,
                    players: ConcurrentIdMap::new(),
                    generators: ConcurrentIdMap::new(),
                }))
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn delete_state(&self, game_id: u32, state_id: u32) -> Result<()> {
        self.games
            .access(game_id, |entry| {
                entry
                    .states
                    .erase(state_id)
                    .map(|_| ())
                    .ok_or(ServiceError::UnknownId(state_id))
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn state_json(&self, game_id: u32, state_id: u32) -> Result<Value> {
        self.with_state(game_id, state_id, |_, state| state.state().to_json())
    }

    /// Snapshots the game and state out of the registry and releases the
    /// lock immediately. Searches run against this clone rather than the
    /// registered state, so a long search never blocks unrelated
    /// `take_action`/`delete_state` calls on the same id, and a concurrent
    /// mutation never corrupts a search already in flight.
    pub fn snapshot_state(&self, game_id: u32, state_id: u32) -> Result<(Arc<dyn Game>, Box<dyn State>)> {
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| (game, state.state().clone_box()))
                    .ok_or(ServiceError::UnknownId(state_id))
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn with_state<R>(
        &self,
        game_id: u32,
        state_id: u32,
        f: impl FnOnce(&dyn Game, &StateEntry) -> R,
    ) -> Result<R> {
        let err = ServiceError::UnknownId(state_id);
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| f(game.as_ref(), state))
                    .ok_or_else(|| err)
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    /// Commits `action` against the registered state, then notifies every
    /// sub-player and sub-action-generator registered under it in parallel
    /// so none of them drift out of sync with the state they were bound to.
    /// Rejects the action before applying anything if the game considers it
    /// illegal, so a rejected `take_action` never mutates registry state.
    pub fn take_action(&self, game_id: u32, state_id: u32, action: &dyn Action) -> Result<TakeActionOutcome> {
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| {
                        if !game.is_valid_action(state.state.as_ref(), action) {
                            return Err(ServiceError::InvalidAction);
                        }
                        let result = game.take_action(state.state.as_mut(), action);
                        rayon::join(
                            || state.players.for_each_parallel(|_, player| player.update(action)),
                            || state.generators.for_each_parallel(|_, gen_entry| gen_entry.update(action)),
                        );
                        Ok(TakeActionOutcome {
                            state_json: state.state.to_json(),
                            next_player: game.next_player(state.state.as_ref()),
                            result,
                        })
                    })
                    .ok_or(ServiceError::UnknownId(state_id))?
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn create_player(
        &self,
        game_id: u32,
        state_id: u32,
        type_tag: &str,
        data: &Value,
    ) -> Result<u32> {
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| {
                        let player = player::create(game.clone(), state.state.as_ref(), type_tag, data)?;
                        Ok(state.players.insert(player))
                    })
                    .ok_or(ServiceError::UnknownId(state_id))?
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn delete_player(&self, game_id: u32, state_id: u32, player_id: u32) -> Result<()> {
        self.games
            .access(game_id, |entry| {
                entry
                    .states
                    .access(state_id, |state| {
                        state
                            .players
                            .erase(player_id)
                            .map(|_| ())
                            .ok_or(ServiceError::UnknownId(player_id))
                    })
                    .ok_or(ServiceError::UnknownId(state_id))
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn create_action_generator(
        &self,
        game_id: u32,
        state_id: u32,
        type_tag: &str,
        data: &Value,
    ) -> Result<u32> {
        let generator = actiongen::create(type_tag, data)?;
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| {
                        let ag_data = generator.create_data(game.as_ref(), state.state.as_ref());
                        state.generators.insert(GeneratorEntry {
                            generator,
                            data: Mutex::new(ag_data),
                        })
                    })
                    .ok_or(ServiceError::UnknownId(state_id))?
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn delete_action_generator(&self, game_id: u32, state_id: u32, ag_id: u32) -> Result<()> {
        self.games
            .access(game_id, |entry| {
                entry
                    .states
                    .access(state_id, |state| {
                        state
                            .generators
                            .erase(ag_id)
                            .map(|_| ())
                            .ok_or(ServiceError::UnknownId(ag_id))
                    })
                    .ok_or(ServiceError::UnknownId(state_id))
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }
}

impl StateEntry {
    pub fn state(&self) -> &dyn State {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> &mut dyn State {
        self.state.as_mut()
    }
}

impl Registry {
    pub fn with_player<R>(
        &self,
        game_id: u32,
        state_id: u32,
        player_id: u32,
        f: impl FnOnce(&dyn Game, &dyn State, &dyn Player) -> R,
    ) -> Result<R> {
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| {
                        let game = game.clone();
                        let state_ref: &dyn State = state.state.as_ref();
                        state
                            .players
                            .access(player_id, move |player| {
                                f(game.as_ref(), state_ref, player.as_ref())
                            })
                            .ok_or(ServiceError::UnknownId(player_id))
                    })
                    .ok_or(ServiceError::UnknownId(state_id))?
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }

    pub fn with_action_generator<R>(
        &self,
        game_id: u32,
        state_id: u32,
        ag_id: u32,
        f: impl FnOnce(&dyn Game, &dyn State, &dyn ActionGenerator, &dyn AgData) -> R,
    ) -> Result<R> {
        self.games
            .access(game_id, |entry| {
                let game = entry.game.clone();
                entry
                    .states
                    .access(state_id, |state| {
                        let game = game.clone();
                        let state_ref: &dyn State = state.state.as_ref();
                        state
                            .generators
                            .access(ag_id, move |gen_entry| {
                                let data = gen_entry.data.lock().expect("registry lock poisoned");
                                f(game.as_ref(), state_ref, gen_entry.generator.as_ref(), data.as_ref())
                            })
                            .ok_or(ServiceError::UnknownId(ag_id))
                    })
                    .ok_or(ServiceError::UnknownId(state_id))?
            })
            .ok_or(ServiceError::UnknownId(game_id))?
    }
}
