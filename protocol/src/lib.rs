//! 国际象棋共享协议库
//!
//! 包含:
//! - 棋子、棋盘、位置（格子名称）等核心数据结构
//! - 走法生成和规则验证
//! - 规则引擎接口 (RulesEngine) 及参考实现
//! - FEN 与简化代数记谱

mod board;
mod constants;
mod error;
mod fen;
mod moves;
mod notation;
mod piece;
mod rules;

pub use board::{Board, BoardState};
pub use constants::*;
pub use error::{ChessError, Result};
pub use fen::{Fen, INITIAL_FEN};
pub use moves::{Move, MoveGenerator};
pub use notation::Notation;
pub use piece::{coords_from_square, square_from_coords, Piece, PieceType, Position, Side};
pub use rules::{MoveOutcome, RulesEngine, StandardRules};
