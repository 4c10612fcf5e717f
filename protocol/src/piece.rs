//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_HEIGHT, BOARD_WIDTH, FILE_LETTERS};
use crate::error::ChessError;

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    /// 王
    King,
    /// 后
    Queen,
    /// 车
    Rook,
    /// 象
    Bishop,
    /// 马
    Knight,
    /// 兵
    Pawn,
}

impl PieceType {
    /// 所有棋子类型
    pub fn all() -> [PieceType; 6] {
        [
            PieceType::King,
            PieceType::Queen,
            PieceType::Rook,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Pawn,
        ]
    }

    /// 小写名称（配置文件的键、动画片段后缀都使用这个名称）
    pub fn name(&self) -> &'static str {
        match self {
            PieceType::King => "king",
            PieceType::Queen => "queen",
            PieceType::Rook => "rook",
            PieceType::Bishop => "bishop",
            PieceType::Knight => "knight",
            PieceType::Pawn => "pawn",
        }
    }

    /// 从名称解析，忽略大小写，也接受单个 FEN 字母
    pub fn from_name(name: &str) -> Option<PieceType> {
        let name = name.trim().to_ascii_lowercase();
        PieceType::all()
            .into_iter()
            .find(|t| t.name() == name)
            .or_else(|| {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => PieceType::from_fen_char(c).map(|(t, _)| t),
                    _ => None,
                }
            })
    }

    /// 是否为远程滑行棋子（车、象、后）
    pub fn is_sliding(&self) -> bool {
        matches!(self, PieceType::Rook | PieceType::Bishop | PieceType::Queen)
    }

    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, side: Side) -> char {
        let c = match self {
            PieceType::King => 'k',
            PieceType::Queen => 'q',
            PieceType::Rook => 'r',
            PieceType::Bishop => 'b',
            PieceType::Knight => 'n',
            PieceType::Pawn => 'p',
        };
        match side {
            Side::White => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceType, Side)> {
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        let piece_type = match c.to_ascii_lowercase() {
            'k' => PieceType::King,
            'q' => PieceType::Queen,
            'r' => PieceType::Rook,
            'b' => PieceType::Bishop,
            'n' => PieceType::Knight,
            'p' => PieceType::Pawn,
            _ => return None,
        };
        Some((piece_type, side))
    }

    /// 代数记谱中的棋子字母（兵为空）
    pub fn notation_letter(&self) -> Option<char> {
        match self {
            PieceType::Pawn => None,
            other => Some(other.to_fen_char(Side::White)),
        }
    }
}

impl std::fmt::Display for PieceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 白方（先手，在下方）
    White,
    /// 黑方（后手，在上方）
    Black,
}

impl Side {
    /// 获取对方阵营
    pub fn opponent(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// 小写名称
    pub fn name(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }

    /// 从名称解析，忽略大小写
    pub fn from_name(name: &str) -> Option<Side> {
        match name.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Some(Side::White),
            "black" | "b" => Some(Side::Black),
            _ => None,
        }
    }

    /// 兵前进的方向（rank 增量）
    pub fn forward(&self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Side::White => 'w',
            Side::Black => 'b',
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Side> {
        match c {
            'w' | 'W' => Some(Side::White),
            'b' | 'B' => Some(Side::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub piece_type: PieceType,
    pub side: Side,
}

impl Piece {
    /// 创建新棋子
    pub fn new(piece_type: PieceType, side: Side) -> Self {
        Self { piece_type, side }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.piece_type.to_fen_char(self.side)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceType::from_fen_char(c).map(|(piece_type, side)| Piece { piece_type, side })
    }
}

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 列 (0-7，对应 a-h)
    pub file: u8,
    /// 行 (0-7，对应 1-8)
    pub rank: u8,
}

impl Position {
    /// 创建新位置
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (file as usize) < BOARD_WIDTH && (rank as usize) < BOARD_HEIGHT {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    /// 创建新位置（不检查边界，内部使用）
    pub const fn new_unchecked(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    /// 检查位置是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.file as usize) < BOARD_WIDTH && (self.rank as usize) < BOARD_HEIGHT
    }

    /// 获取偏移后的位置
    pub fn offset(&self, df: i8, dr: i8) -> Option<Position> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if file >= 0 && (file as usize) < BOARD_WIDTH && rank >= 0 && (rank as usize) < BOARD_HEIGHT {
            Some(Position {
                file: file as u8,
                rank: rank as u8,
            })
        } else {
            None
        }
    }

    /// 转换为数组索引
    pub fn to_index(&self) -> usize {
        self.rank as usize * BOARD_WIDTH + self.file as usize
    }

    /// 从数组索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_WIDTH * BOARD_HEIGHT {
            Some(Position {
                file: (index % BOARD_WIDTH) as u8,
                rank: (index / BOARD_WIDTH) as u8,
            })
        } else {
            None
        }
    }

    /// 格子名称，如 "e4"
    pub fn square_name(&self) -> String {
        let mut name = String::with_capacity(2);
        name.push(FILE_LETTERS[self.file as usize % BOARD_WIDTH]);
        name.push(char::from(b'1' + self.rank));
        name
    }

    /// 从格子名称解析（忽略大小写）
    pub fn from_square(name: &str) -> Option<Position> {
        let mut chars = name.trim().chars();
        let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
            return None;
        };
        let f = f.to_ascii_lowercase();
        if !('a'..='h').contains(&f) || !('1'..='8').contains(&r) {
            return None;
        }
        Position::new(f as u8 - b'a', r as u8 - b'1')
    }

    /// 从格子名称解析，失败时返回错误
    pub fn parse_square(name: &str) -> Result<Position, ChessError> {
        Position::from_square(name).ok_or_else(|| ChessError::InvalidSquare(name.to_string()))
    }

    /// 两个位置之间的切比雪夫距离（王步距离）
    pub fn chebyshev_distance(&self, other: Position) -> u8 {
        let df = (self.file as i8 - other.file as i8).unsigned_abs();
        let dr = (self.rank as i8 - other.rank as i8).unsigned_abs();
        df.max(dr)
    }

    /// 到目标位置的单位方向（仅当两者同行、同列或同斜线时）
    pub fn line_direction(&self, to: Position) -> Option<(i8, i8)> {
        let df = to.file as i8 - self.file as i8;
        let dr = to.rank as i8 - self.rank as i8;
        if df == 0 && dr == 0 {
            return None;
        }
        if df == 0 || dr == 0 || df.abs() == dr.abs() {
            Some((df.signum(), dr.signum()))
        } else {
            None
        }
    }

    /// 检查两个位置是否在同一行、列或斜线上
    pub fn is_aligned_with(&self, other: Position) -> bool {
        self.line_direction(other).is_some()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.square_name())
    }
}

/// 坐标转换为格子名称，越界返回 None
pub fn square_from_coords(file: u8, rank: u8) -> Option<String> {
    Position::new(file, rank).map(|p| p.square_name())
}

/// 格子名称转换为坐标
pub fn coords_from_square(name: &str) -> Option<(u8, u8)> {
    Position::from_square(name).map(|p| (p.file, p.rank))
}
