//! `A3-B4` move notation: column letter A-H, row number 1-8

use super::board::{Move, Square, BOARD_SIZE};
use crate::errors::ErrorKind;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("Expected a move like A3-B4, got '{0}'")]
    WrongShape(String),

    #[error("Missing square in '{0}'")]
    MissingSquare(String),

    #[error("Column '{0}' is not between A and H")]
    BadColumn(char),

    #[error("Row '{0}' is not between 1 and 8")]
    BadRow(String),
}

impl NotationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Parse `"A3-B4"` (spaces ignored, any case) into a move
pub fn parse_move(text: &str) -> Result<Move, NotationError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = compact.split('-').collect();
    let [from, to] = parts.as_slice() else {
        return Err(NotationError::WrongShape(text.trim().to_string()));
    };
    Ok(Move::new(parse_square(from, text)?, parse_square(to, text)?))
}

pub fn parse_square(token: &str, original: &str) -> Result<Square, NotationError> {
    let mut chars = token.chars();
    let Some(letter) = chars.next() else {
        return Err(NotationError::MissingSquare(original.trim().to_string()));
    };

    let letter = letter.to_ascii_uppercase();
    if !('A'..='H').contains(&letter) {
        return Err(NotationError::BadColumn(letter));
    }

    // Exactly one digit: no signs, no leading zeros
    let digits = chars.as_str();
    let row = match digits.as_bytes() {
        [digit @ b'1'..=b'9'] => digit - b'0',
        _ => return Err(NotationError::BadRow(digits.to_string())),
    };
    if row > BOARD_SIZE {
        return Err(NotationError::BadRow(digits.to_string()));
    }

    Square::new(row - 1, letter as u8 - b'A').ok_or_else(|| NotationError::BadRow(digits.to_string()))
}

pub fn format_square(square: Square) -> String {
    format!("{}{}", (b'A' + square.col) as char, square.row + 1)
}

pub fn format_move(mv: Move) -> String {
    format!("{}-{}", format_square(mv.from), format_square(mv.to))
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_move(*self))
    }
}
