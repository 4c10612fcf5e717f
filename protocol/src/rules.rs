//! 规则引擎接口
//!
//! 动画层只通过 [`RulesEngine`] 询问合法落点并提交走法，
//! 规则实现可以替换；[`StandardRules`] 是随库提供的参考实现。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, BoardState};
use crate::error::ChessError;
use crate::fen::Fen;
use crate::moves::MoveGenerator;
use crate::notation::Notation;
use crate::piece::{PieceType, Position, Side};

/// 提交走法的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// 规则引擎是否接受了走法
    pub accepted: bool,
    /// 被吃棋子的类型
    pub captured_type: Option<PieceType>,
    /// 走完后对方是否被将军
    pub is_check: bool,
    /// 走完后对方是否被将死
    pub is_checkmate: bool,
    /// 代数记谱
    pub standard_notation: Option<String>,
    /// 走完后的局面（FEN）
    pub resulting_position: String,
}

impl MoveOutcome {
    /// 被拒绝的走法，局面不变
    pub fn rejected(position: String) -> Self {
        Self {
            accepted: false,
            captured_type: None,
            is_check: false,
            is_checkmate: false,
            standard_notation: None,
            resulting_position: position,
        }
    }
}

/// 规则引擎
pub trait RulesEngine {
    /// 当前棋盘
    fn current_board_state(&self) -> Board;

    /// 指定格子上棋子的合法落点
    fn legal_destinations(&self, from: Position) -> Vec<Position>;

    /// 提交走法
    fn apply_move(&mut self, from: Position, to: Position) -> MoveOutcome;

    /// 当前走子方
    fn side_to_move(&self) -> Side;
}

/// 参考规则实现
#[derive(Debug, Clone, Default)]
pub struct StandardRules {
    state: BoardState,
    game_over: bool,
}

impl StandardRules {
    /// 初始局面
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 FEN 创建
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        Ok(Self::from_state(Fen::parse(fen)?))
    }

    /// 从已有局面创建
    pub fn from_state(state: BoardState) -> Self {
        let game_over = MoveGenerator::generate_legal(&state).is_empty();
        Self { state, game_over }
    }

    /// 当前局面
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// 游戏是否已结束（将死或无子可动）
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// 校验并执行走法
    pub fn try_apply(&mut self, from: Position, to: Position) -> Result<MoveOutcome, ChessError> {
        if self.game_over {
            return Err(ChessError::GameOver);
        }

        let piece = self
            .state
            .board
            .get(from)
            .ok_or_else(|| ChessError::NoPiece(from.square_name()))?;
        if piece.side != self.state.current_turn {
            return Err(ChessError::NotYourTurn);
        }

        let Some(mv) = MoveGenerator::generate_legal_from(&self.state, from)
            .into_iter()
            .find(|m| m.to == to)
        else {
            // 走法本身可达，但会让己方王被将军
            if MoveGenerator::generate_pseudo_legal_from(&self.state.board, from)
                .iter()
                .any(|m| m.to == to)
            {
                return Err(ChessError::KingInCheck);
            }
            return Err(ChessError::InvalidMove {
                from: from.square_name(),
                to: to.square_name(),
            });
        };

        let notation = Notation::to_algebraic(&self.state, &mv);

        let captured = mv.apply_to(&mut self.state.board);
        if captured.is_some() || piece.piece_type == PieceType::Pawn {
            self.state.halfmove_clock = 0;
        } else {
            self.state.halfmove_clock += 1;
        }
        self.state.switch_turn();

        let is_check = MoveGenerator::is_in_check(&self.state.board, self.state.current_turn);
        let no_moves = MoveGenerator::generate_legal(&self.state).is_empty();
        self.game_over = no_moves;

        Ok(MoveOutcome {
            accepted: true,
            captured_type: captured.map(|p| p.piece_type),
            is_check,
            is_checkmate: is_check && no_moves,
            standard_notation: notation,
            resulting_position: Fen::to_string(&self.state),
        })
    }
}

impl RulesEngine for StandardRules {
    fn current_board_state(&self) -> Board {
        self.state.board.clone()
    }

    fn legal_destinations(&self, from: Position) -> Vec<Position> {
        if self.game_over {
            return Vec::new();
        }
        MoveGenerator::generate_legal_from(&self.state, from)
            .into_iter()
            .map(|m| m.to)
            .collect()
    }

    fn apply_move(&mut self, from: Position, to: Position) -> MoveOutcome {
        match self.try_apply(from, to) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("走法被拒绝 {} -> {}: {}", from, to, e);
                MoveOutcome::rejected(Fen::to_string(&self.state))
            }
        }
    }

    fn side_to_move(&self) -> Side {
        self.state.current_turn
    }
}
