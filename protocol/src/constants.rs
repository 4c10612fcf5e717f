//! 棋盘常量定义

/// 棋盘宽度（列数，a-h）
pub const BOARD_WIDTH: usize = 8;

/// 棋盘高度（行数，1-8）
pub const BOARD_HEIGHT: usize = 8;

/// 棋盘格子总数
pub const BOARD_SQUARES: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// 最多同时存在的棋子数量
pub const MAX_PIECES: usize = 32;

/// 列字母
pub const FILE_LETTERS: [char; BOARD_WIDTH] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
