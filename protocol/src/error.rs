//! 错误类型定义

use thiserror::Error;

/// 象棋规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChessError {
    /// 无效的格子名称
    #[error("Invalid square name: {0:?}")]
    InvalidSquare(String),

    /// 无效的走法
    #[error("Invalid move: {from} -> {to}")]
    InvalidMove { from: String, to: String },

    /// 没有棋子
    #[error("No piece at {0}")]
    NoPiece(String),

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 走法会导致被将军
    #[error("Move would leave king in check")]
    KingInCheck,

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

/// 规则操作结果类型
pub type Result<T> = std::result::Result<T, ChessError>;
