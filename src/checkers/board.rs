//! 8x8 draughts board and move generation
//!
//! Row 0 is Dark's home edge, row 7 Light's. Only squares with an odd
//! `row + col` are ever occupied. Men move and capture forward only, kings in
//! all four diagonal directions. Capturing is available but never forced.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const BOARD_SIZE: u8 = 8;

const MAN_LIGHT_DIRS: &[(i8, i8)] = &[(-1, -1), (-1, 1)];
const MAN_DARK_DIRS: &[(i8, i8)] = &[(1, -1), (1, 1)];
const KING_DIRS: &[(i8, i8)] = &[(-1, -1), (-1, 1), (1, -1), (1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }

    pub fn is_playable(&self) -> bool {
        (self.row + self.col) % 2 == 1
    }

    fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = u8::try_from(self.row as i8 + dr).ok()?;
        let col = u8::try_from(self.col as i8 + dc).ok()?;
        Square::new(row, col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Moves first, starts on rows 5-7 and advances toward row 0
    Light,
    /// Starts on rows 0-2 and advances toward row 7
    Dark,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Light => Side::Dark,
            Side::Dark => Side::Light,
        }
    }

    /// Row on which a man of this side is crowned
    pub fn promotion_row(self) -> u8 {
        match self {
            Side::Light => 0,
            Side::Dark => BOARD_SIZE - 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Light => write!(f, "Light"),
            Side::Dark => write!(f, "Dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Man,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub side: Side,
    pub kind: PieceKind,
}

impl Piece {
    pub fn man(side: Side) -> Self {
        Self {
            side,
            kind: PieceKind::Man,
        }
    }

    pub fn king(side: Side) -> Self {
        Self {
            side,
            kind: PieceKind::King,
        }
    }

    pub fn directions(&self) -> &'static [(i8, i8)] {
        match (self.kind, self.side) {
            (PieceKind::King, _) => KING_DIRS,
            (PieceKind::Man, Side::Light) => MAN_LIGHT_DIRS,
            (PieceKind::Man, Side::Dark) => MAN_DARK_DIRS,
        }
    }

    fn symbol(&self) -> char {
        match (self.side, self.kind) {
            (Side::Light, PieceKind::Man) => 'o',
            (Side::Light, PieceKind::King) => 'O',
            (Side::Dark, PieceKind::Man) => 'x',
            (Side::Dark, PieceKind::King) => 'X',
        }
    }
}

pub type Cell = Option<Piece>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }

    pub fn is_jump(&self) -> bool {
        self.from.row.abs_diff(self.to.row) == 2
    }

    /// Square between `from` and `to` for a jump
    pub fn jumped_square(&self) -> Option<Square> {
        if !self.is_jump() || self.from.col.abs_diff(self.to.col) != 2 {
            return None;
        }
        Square::new(
            (self.from.row + self.to.row) / 2,
            (self.from.col + self.to.col) / 2,
        )
    }
}

/// What a move did to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub piece: Piece,
    pub captured: Option<Square>,
    pub promoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE as usize]; BOARD_SIZE as usize],
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; BOARD_SIZE as usize]; BOARD_SIZE as usize],
        }
    }

    /// Standard opening: Dark on rows 0-2, Light on rows 5-7
    pub fn initial() -> Self {
        let mut board = Self::empty();
        for square in Self::squares().filter(Square::is_playable) {
            match square.row {
                0..=2 => board.set(square, Some(Piece::man(Side::Dark))),
                5..=7 => board.set(square, Some(Piece::man(Side::Light))),
                _ => {}
            }
        }
        board
    }

    pub fn squares() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Square { row, col }))
    }

    pub fn get(&self, square: Square) -> Cell {
        self.cells[square.row as usize][square.col as usize]
    }

    pub fn set(&mut self, square: Square, cell: Cell) {
        self.cells[square.row as usize][square.col as usize] = cell;
    }

    pub fn count(&self, side: Side) -> usize {
        Self::squares()
            .filter(|&sq| matches!(self.get(sq), Some(piece) if piece.side == side))
            .count()
    }

    fn occupied_by(&self, side: Side) -> impl Iterator<Item = Square> + '_ {
        Self::squares().filter(move |&sq| matches!(self.get(sq), Some(piece) if piece.side == side))
    }

    /// Jumps available to the piece on `from`
    pub fn captures_from(&self, from: Square) -> Vec<Move> {
        let Some(piece) = self.get(from) else {
            return Vec::new();
        };
        self.captures_for(from, piece)
    }

    fn captures_for(&self, from: Square, piece: Piece) -> Vec<Move> {
        piece
            .directions()
            .iter()
            .filter_map(|&(dr, dc)| {
                let over = from.offset(dr, dc)?;
                let land = from.offset(2 * dr, 2 * dc)?;
                let victim = self.get(over)?;
                (victim.side != piece.side && self.get(land).is_none())
                    .then_some(Move::new(from, land))
            })
            .collect()
    }

    fn steps_from(&self, from: Square, piece: Piece) -> Vec<Move> {
        piece
            .directions()
            .iter()
            .filter_map(|&(dr, dc)| {
                let to = from.offset(dr, dc)?;
                self.get(to).is_none().then_some(Move::new(from, to))
            })
            .collect()
    }

    /// Every move `turn` may make; with `captures_only` just the jumps
    pub fn legal_moves(&self, turn: Side, captures_only: bool) -> Vec<Move> {
        let mut moves = Vec::new();
        for from in self.occupied_by(turn) {
            let Some(piece) = self.get(from) else {
                continue;
            };
            if !captures_only {
                moves.extend(self.steps_from(from, piece));
            }
            moves.extend(self.captures_for(from, piece));
        }
        moves
    }

    pub fn has_legal_move(&self, turn: Side) -> bool {
        !self.legal_moves(turn, false).is_empty()
    }

    pub fn is_legal_move(&self, turn: Side, mv: Move) -> bool {
        match self.get(mv.from) {
            Some(piece) if piece.side == turn => {
                let candidates = if mv.is_jump() {
                    self.captures_for(mv.from, piece)
                } else {
                    self.steps_from(mv.from, piece)
                };
                candidates.contains(&mv)
            }
            _ => false,
        }
    }

    /// Relocate the piece, remove any jumped piece and crown on the far row.
    ///
    /// Legality is the caller's business.
    pub fn apply(&mut self, mv: Move) -> Option<Applied> {
        let piece = self.get(mv.from)?;
        self.set(mv.from, None);

        let captured = mv.jumped_square();
        if let Some(square) = captured {
            self.set(square, None);
        }

        let promoted = piece.kind == PieceKind::Man && mv.to.row == piece.side.promotion_row();
        let landed = if promoted { Piece::king(piece.side) } else { piece };
        self.set(mv.to, Some(landed));

        Some(Applied {
            piece,
            captured,
            promoted,
        })
    }
}

impl fmt::Display for Board {
    /// Column letters A-H across the top, row numbers 1-8 down the side
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {}", (b'A' + col) as char)?;
        }
        writeln!(f)?;

        for row in 0..BOARD_SIZE {
            write!(f, "{}", row + 1)?;
            for col in 0..BOARD_SIZE {
                let square = Square { row, col };
                let symbol = match self.get(square) {
                    Some(piece) => piece.symbol(),
                    None if square.is_playable() => '.',
                    None => ' ',
                };
                write!(f, " {}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    #[test]
    fn test_initial_layout() {
        let board = Board::initial();
        assert_eq!(board.count(Side::Light), 12);
        assert_eq!(board.count(Side::Dark), 12);
        assert_eq!(board.get(sq(0, 1)), Some(Piece::man(Side::Dark)));
        assert_eq!(board.get(sq(7, 0)), Some(Piece::man(Side::Light)));
        assert_eq!(board.get(sq(0, 0)), None);
        assert!(Board::squares()
            .filter(|s| !s.is_playable())
            .all(|s| board.get(s).is_none()));
    }

    #[test]
    fn test_opening_moves_are_forward_steps() {
        let board = Board::initial();
        let moves = board.legal_moves(Side::Light, false);
        assert_eq!(moves.len(), 7);
        for mv in &moves {
            assert_eq!(mv.from.row, 5);
            assert_eq!(mv.to.row, 4);
            assert!(!mv.is_jump());
        }
        assert!(board.legal_moves(Side::Light, true).is_empty());
    }

    #[test]
    fn test_capture_removes_jumped_piece() {
        let mut board = Board::empty();
        board.set(sq(5, 2), Some(Piece::man(Side::Light)));
        board.set(sq(4, 3), Some(Piece::man(Side::Dark)));

        let jump = Move::new(sq(5, 2), sq(3, 4));
        assert!(board.is_legal_move(Side::Light, jump));
        assert_eq!(board.legal_moves(Side::Light, true), vec![jump]);

        let applied = board.apply(jump).unwrap();
        assert_eq!(applied.captured, Some(sq(4, 3)));
        assert_eq!(board.count(Side::Dark), 0);
    }

    #[test]
    fn test_men_cannot_move_backward_but_kings_can() {
        let mut board = Board::empty();
        board.set(sq(4, 3), Some(Piece::man(Side::Light)));
        assert!(!board.is_legal_move(Side::Light, Move::new(sq(4, 3), sq(5, 4))));

        board.set(sq(4, 3), Some(Piece::king(Side::Light)));
        assert!(board.is_legal_move(Side::Light, Move::new(sq(4, 3), sq(5, 4))));
        assert_eq!(board.legal_moves(Side::Light, false).len(), 4);
    }

    #[test]
    fn test_promotion_on_far_row() {
        let mut board = Board::empty();
        board.set(sq(1, 2), Some(Piece::man(Side::Light)));
        let applied = board.apply(Move::new(sq(1, 2), sq(0, 1))).unwrap();
        assert!(applied.promoted);
        assert_eq!(board.get(sq(0, 1)), Some(Piece::king(Side::Light)));
    }

    #[test]
    fn test_cannot_jump_own_piece_or_onto_occupied_square() {
        let mut board = Board::empty();
        board.set(sq(5, 2), Some(Piece::man(Side::Light)));
        board.set(sq(4, 3), Some(Piece::man(Side::Light)));
        assert!(board.captures_from(sq(5, 2)).is_empty());

        board.set(sq(4, 3), Some(Piece::man(Side::Dark)));
        board.set(sq(3, 4), Some(Piece::man(Side::Dark)));
        assert!(board.captures_from(sq(5, 2)).is_empty());
    }

    #[test]
    fn test_display_has_labels() {
        let text = Board::initial().to_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("  A B C D E F G H"));
        assert_eq!(lines.next(), Some("1   x   x   x   x"));
        assert_eq!(text.lines().count(), 9);
    }
}
