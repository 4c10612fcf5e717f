//! 简化代数记谱法
//!
//! 格式：`<棋子字母><消歧义><x><目标格>[=Q][+|#]`
//! - 兵没有棋子字母，吃子时以起始列代替
//! - 同类棋子可到达同一格时，先用列、再用行消歧义

use crate::board::BoardState;
use crate::moves::{Move, MoveGenerator};
use crate::piece::PieceType;

/// 代数记谱法
pub struct Notation;

impl Notation {
    /// 将走法转换为代数记谱（state 为走棋前的局面）
    pub fn to_algebraic(state: &BoardState, mv: &Move) -> Option<String> {
        let piece = state.board.get(mv.from)?;
        let mut san = String::new();

        match piece.piece_type.notation_letter() {
            Some(letter) => {
                san.push(letter);
                san.push_str(&Self::disambiguation(state, mv, piece.piece_type));
            }
            None if mv.captured.is_some() => {
                san.push_str(&mv.from.square_name()[..1]);
            }
            None => {}
        }

        if mv.captured.is_some() {
            san.push('x');
        }
        san.push_str(&mv.to.square_name());

        if let Some(promotion) = mv.promotion.and_then(|p| p.notation_letter()) {
            san.push('=');
            san.push(promotion);
        }

        // 检查将军 / 将死
        let mut after = state.clone();
        mv.apply_to(&mut after.board);
        after.switch_turn();
        if MoveGenerator::is_in_check(&after.board, after.current_turn) {
            if MoveGenerator::generate_legal(&after).is_empty() {
                san.push('#');
            } else {
                san.push('+');
            }
        }

        Some(san)
    }

    /// 计算消歧义前缀
    fn disambiguation(state: &BoardState, mv: &Move, piece_type: PieceType) -> String {
        let rivals: Vec<Move> = MoveGenerator::generate_legal(state)
            .into_iter()
            .filter(|other| {
                other.to == mv.to
                    && other.from != mv.from
                    && state.board.get(other.from).map(|p| p.piece_type) == Some(piece_type)
            })
            .collect();

        if rivals.is_empty() {
            return String::new();
        }

        let name = mv.from.square_name();
        if rivals.iter().all(|other| other.from.file != mv.from.file) {
            name[..1].to_string()
        } else if rivals.iter().all(|other| other.from.rank != mv.from.rank) {
            name[1..].to_string()
        } else {
            name
        }
    }
}
