//! The rule engine: owns the game state and applies placements.
//!
//! All mutation goes through [`Game::place_mark`] (or [`Game::try_place`])
//! and [`Game::reset_game`]. Callers read state through [`Game::state`] or an
//! owned [`Game::snapshot`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::{Board, Player, Pos, MAX_MOVES_PER_PLAYER};

/// Why a placement was rejected.
///
/// [`Game::place_mark`] swallows these; [`Game::try_place`] returns them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    #[error("cell index {0} is off the board")]
    OutOfRange(u8),

    #[error("cell {0} is already occupied")]
    Occupied(Pos),

    #[error("game is over, {0} has already won")]
    GameOver(Player),
}

/// Engine phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No winner yet, placements are accepted.
    Idle,
    /// A winner is set. Only a reset leaves this phase.
    Won,
}

/// Advisory "next piece to go" for each player.
///
/// A player's entry is set only while that player holds the maximum number
/// of pieces, so their next placement will evict it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct EvictionHints {
    pub first: Option<Pos>,
    pub second: Option<Pos>,
}

impl EvictionHints {
    fn compute(board: &Board) -> EvictionHints {
        let hint = |player| {
            if board.pieces(player) >= MAX_MOVES_PER_PLAYER {
                board.oldest(player)
            } else {
                None
            }
        };
        EvictionHints {
            first: hint(Player::First),
            second: hint(Player::Second),
        }
    }

    /// Hint for one player.
    pub fn get(&self, player: Player) -> Option<Pos> {
        match player {
            Player::First => self.first,
            Player::Second => self.second,
        }
    }
}

/// What an accepted placement led to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// No line; the turn passed to the other player.
    Continue,
    /// The game is over.
    Won { winner: Player, line: [Pos; 3] },
    /// The first player completed a line in rigged mode. The win was discarded
    /// and the turn passed as if no line existed.
    WinSuppressed { line: [Pos; 3] },
}

/// Result of an accepted placement.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Placement {
    pub player: Player,
    pub pos: Pos,
    /// Move order assigned to the new mark.
    pub order: u64,
    /// Cell cleared to make room for the new mark, if any.
    pub evicted: Option<Pos>,
    pub outcome: Outcome,
}

/// Complete game state. The engine is its only writer.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_player: Player,
    /// Last move order handed out. Only a reset brings it back to zero.
    pub move_counter: u64,
    pub winner: Option<Player>,
    pub winning_line: Option<[Pos; 3]>,
    pub next_eviction: EvictionHints,
    /// Cell cleared by the most recent accepted placement.
    pub last_evicted: Option<Pos>,
    /// External configuration; the rules only read it.
    pub rigged_mode: bool,
}

impl GameState {
    /// Fresh state: empty board, counter 0, first player to move.
    pub fn new(rigged_mode: bool) -> GameState {
        GameState {
            board: Board::new(),
            current_player: Player::First,
            move_counter: 0,
            winner: None,
            winning_line: None,
            next_eviction: EvictionHints::default(),
            last_evicted: None,
            rigged_mode,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.winner.is_some() {
            Phase::Won
        } else {
            Phase::Idle
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Rolling tic-tac-toe engine.
#[derive(Clone, Debug, Default)]
pub struct Game {
    state: GameState,
}

impl Game {
    /// Create a new game with rigged mode off.
    pub fn new() -> Game {
        Game::default()
    }

    /// Create a new game with the given rigged-mode setting.
    pub fn with_rigged_mode(rigged_mode: bool) -> Game {
        Game {
            state: GameState::new(rigged_mode),
        }
    }

    /// Read-only view of the current state.
    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[inline]
    pub fn rigged_mode(&self) -> bool {
        self.state.rigged_mode
    }

    /// Change rigged mode. Applies from the next placement on; the current
    /// board is not re-evaluated.
    pub fn set_rigged_mode(&mut self, rigged_mode: bool) {
        if self.state.rigged_mode != rigged_mode {
            debug!(rigged_mode, "rigged mode changed");
        }
        self.state.rigged_mode = rigged_mode;
    }

    /// Replace the state with a fresh game. Rigged mode is kept.
    #[instrument(skip(self))]
    pub fn reset_game(&mut self) {
        self.state = GameState::new(self.state.rigged_mode);
        debug!("game reset");
    }

    /// Place the current player's mark at `index`.
    ///
    /// Invalid placements (index off the board, occupied cell, finished game)
    /// are no-ops: the state is untouched and `None` is returned.
    pub fn place_mark(&mut self, index: u8) -> Option<Placement> {
        match self.try_place(index) {
            Ok(placement) => Some(placement),
            Err(err) => {
                debug!(index, %err, "placement ignored");
                None
            }
        }
    }

    /// Place the current player's mark at `index`, reporting why a placement
    /// was rejected. A rejected call leaves the state untouched.
    #[instrument(skip(self), fields(player = %self.state.current_player))]
    pub fn try_place(&mut self, index: u8) -> Result<Placement, PlaceError> {
        let pos = Pos::new(index).ok_or(PlaceError::OutOfRange(index))?;
        if let Some(winner) = self.state.winner {
            return Err(PlaceError::GameOver(winner));
        }
        if !self.state.board.is_empty(pos) {
            return Err(PlaceError::Occupied(pos));
        }

        let state = &mut self.state;
        let player = state.current_player;

        // At most one piece leaves per placement.
        let evicted = if state.board.pieces(player) >= MAX_MOVES_PER_PLAYER {
            let oldest = state.board.oldest(player);
            if let Some(oldest) = oldest {
                state.board.clear(oldest);
                trace!(%oldest, "evicted oldest piece");
            }
            oldest
        } else {
            None
        };

        state.move_counter += 1;
        let order = state.move_counter;
        state.board.put(pos, player, order);
        state.last_evicted = evicted;

        let outcome = match Self::detect_win(&state.board, player, state.rigged_mode) {
            (Some((winner, line)), _) => {
                state.winner = Some(winner);
                state.winning_line = Some(line);
                state.next_eviction = EvictionHints::default();
                debug!(%winner, ?line, "game won");
                Outcome::Won { winner, line }
            }
            (None, suppressed) => {
                state.current_player = player.opponent();
                state.next_eviction = EvictionHints::compute(&state.board);
                match suppressed {
                    Some(line) => {
                        debug!(?line, "first player win suppressed by rigged mode");
                        Outcome::WinSuppressed { line }
                    }
                    None => Outcome::Continue,
                }
            }
        };

        Ok(Placement {
            player,
            pos,
            order,
            evicted,
            outcome,
        })
    }

    /// Returns the honored win, if any, and a first-player line that rigged
    /// mode discarded on this placement, if any.
    ///
    /// In rigged mode the first player's lines never count, so the second
    /// player's lines are searched on their own. A first-player line left
    /// over from a suppressed win cannot shadow a second-player win, and is
    /// only reported as suppressed when the first player is the mover.
    fn detect_win(
        board: &Board,
        mover: Player,
        rigged_mode: bool,
    ) -> (Option<(Player, [Pos; 3])>, Option<[Pos; 3]>) {
        if rigged_mode {
            let honored = board
                .winning_line(Player::Second)
                .map(|line| (Player::Second, line));
            let suppressed = match honored {
                None if mover == Player::First => board.winning_line(Player::First),
                _ => None,
            };
            (honored, suppressed)
        } else {
            (board.check_winner(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Play a sequence of cell indices, asserting each is accepted.
    fn play(game: &mut Game, moves: &[u8]) -> Vec<Placement> {
        moves
            .iter()
            .map(|&index| {
                game.place_mark(index)
                    .unwrap_or_else(|| panic!("move {} rejected on\n{}", index, game.state().board))
            })
            .collect()
    }

    #[test]
    fn test_new_game() {
        let game = Game::new();
        let state = game.state();
        assert_eq!(state.board, Board::new());
        assert_eq!(state.current_player, Player::First);
        assert_eq!(state.move_counter, 0);
        assert_eq!(state.winner, None);
        assert_eq!(state.winning_line, None);
        assert_eq!(state.next_eviction, EvictionHints::default());
        assert_eq!(state.last_evicted, None);
        assert!(!state.rigged_mode);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn test_first_placement() {
        let mut game = Game::new();
        let placement = game.place_mark(4).unwrap();

        assert_eq!(placement.player, Player::First);
        assert_eq!(placement.pos, Pos(4));
        assert_eq!(placement.order, 1);
        assert_eq!(placement.evicted, None);
        assert_eq!(placement.outcome, Outcome::Continue);

        let state = game.state();
        assert_eq!(state.board.owner(Pos(4)), Some(Player::First));
        assert_eq!(state.board.cell(Pos(4)).order(), Some(1));
        assert_eq!(state.current_player, Player::Second);
        assert_eq!(state.move_counter, 1);
    }

    #[test]
    fn test_turns_alternate() {
        let mut game = Game::new();
        let placements = play(&mut game, &[0, 4, 8]);
        let players: Vec<_> = placements.iter().map(|p| p.player).collect();
        assert_eq!(players, vec![Player::First, Player::Second, Player::First]);
        assert_eq!(game.state().current_player, Player::Second);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut game = Game::new();
        play(&mut game, &[0]);
        let before = game.snapshot();

        assert_eq!(game.place_mark(9), None);
        assert_eq!(game.place_mark(200), None);
        assert_eq!(game.try_place(9), Err(PlaceError::OutOfRange(9)));
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_occupied_is_noop() {
        let mut game = Game::new();
        play(&mut game, &[4]);
        let before = game.snapshot();

        // Second player clicking the same cell twice in a row
        assert_eq!(game.try_place(4), Err(PlaceError::Occupied(Pos(4))));
        assert_eq!(game.place_mark(4), None);
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_placement_after_win_is_noop() {
        let mut game = Game::new();
        // X: 0, 1, 2 row; O: 3, 4
        play(&mut game, &[0, 3, 1, 4, 2]);
        assert_eq!(game.phase(), Phase::Won);
        let before = game.snapshot();

        assert_eq!(game.try_place(5), Err(PlaceError::GameOver(Player::First)));
        assert_eq!(game.place_mark(5), None);
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_win_sets_winner_and_keeps_turn() {
        let mut game = Game::new();
        let placements = play(&mut game, &[0, 3, 1, 4, 2]);

        assert_eq!(
            placements[4].outcome,
            Outcome::Won {
                winner: Player::First,
                line: [Pos(0), Pos(1), Pos(2)]
            }
        );
        let state = game.state();
        assert_eq!(state.winner, Some(Player::First));
        assert_eq!(state.winning_line, Some([Pos(0), Pos(1), Pos(2)]));
        assert_eq!(state.current_player, Player::First);
    }

    #[test]
    fn test_no_win_then_second_player_row() {
        let mut game = Game::new();
        // X holds 0, 1, 6 (column 0 is broken by O at 3)
        play(&mut game, &[0, 3, 1, 4, 6]);
        assert_eq!(game.state().winner, None);
        assert_eq!(game.state().current_player, Player::Second);

        let placement = game.place_mark(5).unwrap();
        assert_eq!(
            placement.outcome,
            Outcome::Won {
                winner: Player::Second,
                line: [Pos(3), Pos(4), Pos(5)]
            }
        );
        assert_eq!(game.state().winning_line, Some([Pos(3), Pos(4), Pos(5)]));
    }

    #[test]
    fn test_fourth_piece_evicts_oldest() {
        let mut game = Game::new();
        // X: 0, 5, 7   O: 1, 3, 8   (no lines)
        play(&mut game, &[0, 1, 5, 3, 7, 8]);
        assert_eq!(game.state().board.pieces(Player::First), 3);

        let placement = game.place_mark(2).unwrap();
        assert_eq!(placement.evicted, Some(Pos(0)));
        assert_eq!(placement.outcome, Outcome::Continue);

        let state = game.state();
        assert!(state.board.is_empty(Pos(0)));
        assert_eq!(state.board.pieces(Player::First), 3);
        assert_eq!(
            state.board.positions_of(Player::First).collect::<Vec<_>>(),
            vec![Pos(2), Pos(5), Pos(7)]
        );
        assert_eq!(state.last_evicted, Some(Pos(0)));
        // O's pieces untouched
        assert_eq!(state.board.pieces(Player::Second), 3);
    }

    #[test]
    fn test_evicted_cell_is_playable_again() {
        let mut game = Game::new();
        play(&mut game, &[0, 1, 5, 3, 7, 8, 2]);

        // O takes the cell X just lost; O's oldest (1) goes.
        let placement = game.place_mark(0).unwrap();
        assert_eq!(placement.player, Player::Second);
        assert_eq!(placement.evicted, Some(Pos(1)));
        assert_eq!(game.state().board.owner(Pos(0)), Some(Player::Second));
    }

    #[test]
    fn test_eviction_happens_before_win_check() {
        let mut game = Game::new();
        // X: 0, 1, 8   O: 3, 4, 7   then X plays 2.
        // The eviction removes X at 0 first, so row 0 is not complete.
        play(&mut game, &[0, 3, 1, 4, 8, 7]);
        assert_eq!(game.state().winner, None);

        let placement = game.place_mark(2).unwrap();
        assert_eq!(placement.evicted, Some(Pos(0)));
        assert_eq!(placement.outcome, Outcome::Continue);
        assert_eq!(game.state().winner, None);
    }

    #[test]
    fn test_eviction_hints_track_both_players() {
        let mut game = Game::new();
        play(&mut game, &[0, 1, 5]);
        assert_eq!(game.state().next_eviction, EvictionHints::default());

        play(&mut game, &[3]);
        assert_eq!(game.state().next_eviction, EvictionHints::default());

        // X reaches three pieces
        play(&mut game, &[7]);
        assert_eq!(game.state().next_eviction.get(Player::First), Some(Pos(0)));
        assert_eq!(game.state().next_eviction.get(Player::Second), None);

        // O reaches three pieces
        play(&mut game, &[8]);
        assert_eq!(game.state().next_eviction.first, Some(Pos(0)));
        assert_eq!(game.state().next_eviction.second, Some(Pos(1)));

        // X rolls: oldest is now 5
        play(&mut game, &[2]);
        assert_eq!(game.state().next_eviction.first, Some(Pos(5)));
        assert_eq!(game.state().next_eviction.second, Some(Pos(1)));
    }

    #[test]
    fn test_eviction_hints_cleared_on_win() {
        let mut game = Game::new();
        // X: 6, 1, 2   O: 3, 5, 8
        play(&mut game, &[6, 3, 1, 5, 2, 8]);
        assert_eq!(game.state().next_eviction.first, Some(Pos(6)));
        assert_eq!(game.state().next_eviction.second, Some(Pos(3)));

        // X rolls 6 off and completes row 0
        let placement = game.place_mark(0).unwrap();
        assert_eq!(placement.evicted, Some(Pos(6)));
        assert_eq!(
            placement.outcome,
            Outcome::Won {
                winner: Player::First,
                line: [Pos(0), Pos(1), Pos(2)]
            }
        );
        assert_eq!(game.state().next_eviction, EvictionHints::default());
        assert_eq!(game.state().last_evicted, Some(Pos(6)));
    }

    #[test]
    fn test_move_counter_is_global_and_monotonic() {
        let mut game = Game::new();
        let placements = play(&mut game, &[0, 1, 5, 3, 7, 8, 2, 0]);
        let orders: Vec<_> = placements.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(game.state().move_counter, 8);
    }

    #[test]
    fn test_rejected_move_does_not_advance_counter() {
        let mut game = Game::new();
        play(&mut game, &[0]);
        game.place_mark(0);
        game.place_mark(42);
        assert_eq!(game.state().move_counter, 1);
        assert_eq!(game.place_mark(1).unwrap().order, 2);
    }

    #[test]
    fn test_reset() {
        let mut game = Game::new();
        play(&mut game, &[0, 3, 1, 4, 2]);
        game.reset_game();

        let state = game.state();
        assert_eq!(state.board.live_pieces(), 0);
        assert_eq!(state.move_counter, 0);
        assert_eq!(state.current_player, Player::First);
        assert_eq!(state.winner, None);
        assert_eq!(state.winning_line, None);
        assert_eq!(state.next_eviction, EvictionHints::default());
        assert_eq!(state.last_evicted, None);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn test_reset_keeps_rigged_mode() {
        let mut game = Game::with_rigged_mode(true);
        play(&mut game, &[0]);
        game.reset_game();
        assert!(game.rigged_mode());
        assert_eq!(*game.state(), GameState::new(true));
    }

    // ========== Rigged Mode ==========

    #[test]
    fn test_rigged_suppresses_first_player_win() {
        let mut game = Game::with_rigged_mode(true);
        play(&mut game, &[0, 3, 1, 4]);

        let placement = game.place_mark(2).unwrap();
        assert_eq!(
            placement.outcome,
            Outcome::WinSuppressed {
                line: [Pos(0), Pos(1), Pos(2)]
            }
        );
        let state = game.state();
        assert_eq!(state.winner, None);
        assert_eq!(state.winning_line, None);
        assert_eq!(state.current_player, Player::Second);
        assert_eq!(game.phase(), Phase::Idle);
        // Hints are still computed after a suppressed win
        assert_eq!(state.next_eviction.first, Some(Pos(0)));
    }

    #[test]
    fn test_rigged_honors_second_player_win() {
        let mut game = Game::with_rigged_mode(true);
        play(&mut game, &[0, 3, 1, 4, 8]);

        let placement = game.place_mark(5).unwrap();
        assert_eq!(
            placement.outcome,
            Outcome::Won {
                winner: Player::Second,
                line: [Pos(3), Pos(4), Pos(5)]
            }
        );
        assert_eq!(game.state().winner, Some(Player::Second));
        assert_eq!(game.phase(), Phase::Won);
    }

    #[test]
    fn test_rigged_stale_first_player_line_does_not_hide_second_player_win() {
        let mut game = Game::with_rigged_mode(true);
        // X completes row 0 (suppressed), O then completes row 1.
        play(&mut game, &[0, 3, 1, 4, 2]);
        assert_eq!(game.state().winner, None);

        let placement = game.place_mark(5).unwrap();
        assert_eq!(
            placement.outcome,
            Outcome::Won {
                winner: Player::Second,
                line: [Pos(3), Pos(4), Pos(5)]
            }
        );
    }

    #[test]
    fn test_rigged_second_player_move_after_suppressed_win_continues() {
        let mut game = Game::with_rigged_mode(true);
        play(&mut game, &[0, 3, 1, 4, 2]);

        // X's row 0 is still on the board, but O moved and made no line.
        let placement = game.place_mark(8).unwrap();
        assert_eq!(placement.player, Player::Second);
        assert_eq!(placement.outcome, Outcome::Continue);
        assert_eq!(game.state().winner, None);
        assert_eq!(game.state().current_player, Player::First);
    }

    #[test]
    fn test_rigged_first_player_keeps_rolling() {
        let mut game = Game::with_rigged_mode(true);
        play(&mut game, &[0, 3, 1, 4, 2, 8]);

        // X plays again: oldest X (0) rolls off, row 0 is broken.
        let placement = game.place_mark(6).unwrap();
        assert_eq!(placement.evicted, Some(Pos(0)));
        assert_eq!(placement.outcome, Outcome::Continue);
        assert_eq!(game.state().board.pieces(Player::First), 3);
    }

    #[test]
    fn test_rigged_mode_change_applies_to_next_placement() {
        let mut game = Game::new();
        play(&mut game, &[0, 3, 1, 4]);
        game.set_rigged_mode(true);
        assert_eq!(game.state().winner, None);

        assert!(matches!(
            game.place_mark(2).unwrap().outcome,
            Outcome::WinSuppressed { .. }
        ));

        game.set_rigged_mode(false);
        // Turning it off does not retroactively award the suppressed line.
        assert_eq!(game.state().winner, None);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn test_move_counter_is_wide() {
        let mut game = Game::new();
        game.state.move_counter = u64::from(u32::MAX);

        let placement = game.place_mark(0).unwrap();
        assert_eq!(placement.order, u64::from(u32::MAX) + 1);
        assert_eq!(game.state().move_counter, u64::from(u32::MAX) + 1);
        assert_eq!(game.state().board.cell(Pos(0)).order(), Some(u64::from(u32::MAX) + 1));
    }

    #[test]
    fn test_place_error_messages() {
        assert_eq!(PlaceError::OutOfRange(9).to_string(), "cell index 9 is off the board");
        assert_eq!(PlaceError::Occupied(Pos(4)).to_string(), "cell (1,1) is already occupied");
        assert_eq!(
            PlaceError::GameOver(Player::Second).to_string(),
            "game is over, O has already won"
        );
    }
}
