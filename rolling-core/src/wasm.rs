//! WASM bindings for rolling-core
//!
//! Provides a JavaScript-friendly API for the rule engine. The browser UI
//! owns one `WasmGame`, calls `playCell` on clicks and re-renders from
//! `getState` after every call.

use wasm_bindgen::prelude::*;
use crate::{Game, Player, Pos};

/// WASM-friendly wrapper around Game
#[wasm_bindgen]
pub struct WasmGame {
    inner: Game,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game
    #[wasm_bindgen(constructor)]
    pub fn new(rigged_mode: bool) -> WasmGame {
        WasmGame { inner: Game::with_rigged_mode(rigged_mode) }
    }

    /// Place the current player's mark. Returns false if the click was ignored.
    #[wasm_bindgen(js_name = playCell)]
    pub fn play_cell(&mut self, index: u8) -> bool {
        self.inner.place_mark(index).is_some()
    }

    /// Start over with an empty board (rigged mode is kept)
    #[wasm_bindgen(js_name = resetGame)]
    pub fn reset_game(&mut self) {
        self.inner.reset_game();
    }

    /// Full state snapshot as a plain object:
    /// { board, current_player, move_counter, winner, winning_line,
    ///   next_eviction: { first, second }, last_evicted, rigged_mode }
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.state()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = riggedMode)]
    pub fn rigged_mode(&self) -> bool {
        self.inner.rigged_mode()
    }

    /// Takes effect on the next placement
    #[wasm_bindgen(js_name = setRiggedMode)]
    pub fn set_rigged_mode(&mut self, rigged_mode: bool) {
        self.inner.set_rigged_mode(rigged_mode);
    }

    /// Current player (1 = X, 2 = O)
    #[wasm_bindgen(js_name = currentPlayer)]
    pub fn current_player(&self) -> u8 {
        self.inner.state().current_player as u8
    }

    /// Winner: 0 (none), 1 (X), or 2 (O)
    pub fn winner(&self) -> u8 {
        self.inner.state().winner.map_or(0, |player| player as u8)
    }

    /// Winning line as cell indices, empty if no winner
    #[wasm_bindgen(js_name = winningLine)]
    pub fn winning_line(&self) -> Vec<u8> {
        self.inner
            .state()
            .winning_line
            .map(|line| line.iter().map(|pos| pos.0).collect())
            .unwrap_or_default()
    }

    /// Cell cleared by the last placement, for the fade-out animation
    #[wasm_bindgen(js_name = lastEvicted)]
    pub fn last_evicted(&self) -> Option<u8> {
        self.inner.state().last_evicted.map(|pos| pos.0)
    }

    /// Cell the given player (1 or 2) will lose on their next placement
    #[wasm_bindgen(js_name = nextEviction)]
    pub fn next_eviction(&self, player: u8) -> Option<u8> {
        let player = Player::from_bits(player)?;
        self.inner.state().next_eviction.get(player).map(|pos: Pos| pos.0)
    }

    /// Owner of each cell as [0|1|2; 9]
    pub fn owners(&self) -> Vec<u8> {
        self.inner
            .state()
            .board
            .cells()
            .iter()
            .map(|cell| cell.owner().map_or(0, |player| player as u8))
            .collect()
    }
}

impl Default for WasmGame {
    fn default() -> Self {
        Self::new(false)
    }
}
