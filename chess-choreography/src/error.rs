//! 错误类型定义

use protocol::ChessError;
use thiserror::Error;

use crate::entity::PieceId;

/// 动画编排错误
#[derive(Debug, Error)]
pub enum ChoreographyError {
    /// 找不到棋子实体
    #[error("Unknown piece: {0}")]
    UnknownPiece(PieceId),

    /// 棋子正在退场或已被移除
    #[error("Piece {0} is no longer on the board")]
    PieceNotOnBoard(PieceId),

    /// 目标格不在棋盘上
    #[error("Invalid destination: ({file}, {rank})")]
    InvalidDestination { file: i8, rank: i8 },

    /// 初始化时格子已被占用
    #[error("Square {0} is already occupied")]
    SquareOccupied(String),

    /// 规则层错误
    #[error("Rules error: {0}")]
    Chess(#[from] ChessError),

    /// 配置文件读取失败
    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// 配置文件加载超时
    #[error("Loading config {path} timed out after {timeout_ms} ms")]
    ConfigTimeout { path: String, timeout_ms: u64 },
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ChoreographyError>;
