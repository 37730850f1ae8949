//! Rolling tic-tac-toe rule engine.
//!
//! Classic 3x3 tic-tac-toe with one twist: each player may hold at most
//! [`MAX_MOVES_PER_PLAYER`] pieces. Placing a fourth piece first removes that
//! player's oldest surviving piece, so marks "roll" across the board.
//!
//! # Board Layout
//!
//! ```text
//! Cell indices (row-major order):
//!   (0,0)=0  (0,1)=1  (0,2)=2
//!   (1,0)=3  (1,1)=4  (1,2)=5
//!   (2,0)=6  (2,1)=7  (2,2)=8
//! ```
//!
//! # Cell Encoding
//!
//! A cell is either empty or holds a [`Mark`]: the owner plus the move order
//! it was placed with. Owner and order can only be set or cleared together.
//! Move orders come from one global counter shared by both players, so the
//! smallest order among a player's live marks is that player's oldest piece.

use std::fmt;

use serde::{Deserialize, Serialize};

mod game;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use game::{EvictionHints, Game, GameState, Outcome, Phase, PlaceError, Placement};

/// Maximum number of live pieces a single player may have on the board.
pub const MAX_MOVES_PER_PLAYER: usize = 3;

/// Player identifier.
///
/// The first player is shown as "X" and always moves first after a reset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    #[serde(rename = "X")]
    First = 1,
    #[serde(rename = "O")]
    Second = 2,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    /// Convert from u8 (1 or 2) to Player.
    #[inline]
    pub fn from_bits(bits: u8) -> Option<Player> {
        match bits {
            1 => Some(Player::First),
            2 => Some(Player::Second),
            _ => None,
        }
    }

    /// Display symbol ('X' or 'O').
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Player::First => 'X',
            Player::Second => 'O',
        }
    }

    /// Both players, first player first.
    pub fn all() -> impl Iterator<Item = Player> {
        [Player::First, Player::Second].into_iter()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Position on the 3x3 board (0-8).
///
/// Layout:
/// ```text
///   0 1 2
///   3 4 5
///   6 7 8
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pos(pub u8);

impl Pos {
    /// Create a position from row and column (0-2 each).
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Pos {
        debug_assert!(row < 3 && col < 3);
        Pos(row * 3 + col)
    }

    /// Create a position from a raw index, rejecting anything outside 0-8.
    #[inline]
    pub fn new(index: u8) -> Option<Pos> {
        let pos = Pos(index);
        pos.is_valid().then_some(pos)
    }

    /// Get the row (0-2).
    #[inline]
    pub fn row(self) -> u8 {
        self.0 / 3
    }

    /// Get the column (0-2).
    #[inline]
    pub fn col(self) -> u8 {
        self.0 % 3
    }

    /// Check if this is a valid position (0-8).
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 < 9
    }

    /// Iterate over all 9 positions.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..9).map(Pos)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row(), self.col())
    }
}

/// A placed piece: who owns it and when it was placed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Mark {
    pub owner: Player,
    pub order: u64,
}

/// One board cell. `None` is an empty cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cell(pub Option<Mark>);

impl Cell {
    /// An empty cell.
    pub const EMPTY: Cell = Cell(None);

    #[inline]
    pub fn owner(self) -> Option<Player> {
        self.0.map(|mark| mark.owner)
    }

    #[inline]
    pub fn order(self) -> Option<u64> {
        self.0.map(|mark| mark.order)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0.is_none()
    }
}

/// The 9-cell board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Cell; 9]);

impl Board {
    /// Create a new empty board.
    #[inline]
    pub fn new() -> Board {
        Board([Cell::EMPTY; 9])
    }

    /// Get the cell at a position.
    #[inline]
    pub fn cell(&self, pos: Pos) -> Cell {
        self.0[pos.0 as usize]
    }

    /// All cells in index order.
    #[inline]
    pub fn cells(&self) -> &[Cell; 9] {
        &self.0
    }

    /// Owner of the piece at a position, if any.
    #[inline]
    pub fn owner(&self, pos: Pos) -> Option<Player> {
        self.cell(pos).owner()
    }

    /// Check if a cell is empty.
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.cell(pos).is_empty()
    }

    // ========== Piece Operations ==========

    /// Put a mark on a cell, replacing whatever was there.
    /// Does NOT validate - the engine checks occupancy and piece limits.
    #[inline]
    pub fn put(&mut self, pos: Pos, owner: Player, order: u64) {
        self.0[pos.0 as usize] = Cell(Some(Mark { owner, order }));
    }

    /// Clear a cell. Returns the mark that was removed, if any.
    #[inline]
    pub fn clear(&mut self, pos: Pos) -> Option<Mark> {
        self.0[pos.0 as usize].0.take()
    }

    /// Positions owned by a player, in index order.
    pub fn positions_of(&self, player: Player) -> impl Iterator<Item = Pos> + '_ {
        Pos::all().filter(move |&pos| self.owner(pos) == Some(player))
    }

    /// Count of live pieces for a player.
    pub fn pieces(&self, player: Player) -> usize {
        self.positions_of(player).count()
    }

    /// Position of the player's oldest live piece (smallest move order).
    pub fn oldest(&self, player: Player) -> Option<Pos> {
        Pos::all()
            .filter_map(|pos| match self.cell(pos).0 {
                Some(mark) if mark.owner == player => Some((mark.order, pos)),
                _ => None,
            })
            .min()
            .map(|(_, pos)| pos)
    }

    /// Count of live pieces on the whole board.
    pub fn live_pieces(&self) -> usize {
        self.0.iter().filter(|cell| !cell.is_empty()).count()
    }

    // ========== Win Detection ==========

    /// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
    /// Scan order is fixed and breaks ties when more than one line is complete.
    pub const WIN_LINES: [[Pos; 3]; 8] = [
        [Pos(0), Pos(1), Pos(2)], // Row 0
        [Pos(3), Pos(4), Pos(5)], // Row 1
        [Pos(6), Pos(7), Pos(8)], // Row 2
        [Pos(0), Pos(3), Pos(6)], // Col 0
        [Pos(1), Pos(4), Pos(7)], // Col 1
        [Pos(2), Pos(5), Pos(8)], // Col 2
        [Pos(0), Pos(4), Pos(8)], // Main diagonal
        [Pos(2), Pos(4), Pos(6)], // Anti-diagonal
    ];

    /// Owner of a line if all three cells belong to the same player.
    #[inline]
    fn line_owner(&self, [a, b, c]: [Pos; 3]) -> Option<Player> {
        let owner = self.owner(a)?;
        (self.owner(b) == Some(owner) && self.owner(c) == Some(owner)).then_some(owner)
    }

    /// Check if the given player has three in a row.
    pub fn has_won(&self, player: Player) -> bool {
        self.winning_line(player).is_some()
    }

    /// Get the first winning line for a player, if any.
    pub fn winning_line(&self, player: Player) -> Option<[Pos; 3]> {
        Self::WIN_LINES
            .into_iter()
            .find(|&line| self.line_owner(line) == Some(player))
    }

    /// Find the first complete line in scan order.
    /// Returns the owner and the line, or None if nobody has three in a row.
    pub fn check_winner(&self) -> Option<(Player, [Pos; 3])> {
        Self::WIN_LINES
            .into_iter()
            .find_map(|line| self.line_owner(line).map(|owner| (owner, line)))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                let symbol = match self.owner(Pos::from_row_col(row, col)) {
                    Some(player) => player.symbol(),
                    None => '.',
                };
                write!(f, "{}", symbol)?;
            }
            if row < 2 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
