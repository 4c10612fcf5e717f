//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_HEIGHT, BOARD_SQUARES, BOARD_WIDTH};
use crate::piece::{Piece, PieceType, Position, Side};

/// 后排棋子顺序（a 列到 h 列）
const BACK_RANK: [PieceType; BOARD_WIDTH] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 rank * 8 + file，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; BOARD_SQUARES],
        }
    }

    /// 创建初始棋盘
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for (file, piece_type) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            board.set(Position::new_unchecked(file, 0), Some(Piece::new(*piece_type, Side::White)));
            board.set(Position::new_unchecked(file, 1), Some(Piece::new(PieceType::Pawn, Side::White)));
            board.set(Position::new_unchecked(file, 6), Some(Piece::new(PieceType::Pawn, Side::Black)));
            board.set(Position::new_unchecked(file, 7), Some(Piece::new(*piece_type, Side::Black)));
        }

        board
    }

    /// 获取指定位置的棋子
    pub fn get(&self, pos: Position) -> Option<Piece> {
        if pos.is_valid() {
            self.squares[pos.to_index()]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子
    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        if pos.is_valid() {
            self.squares[pos.to_index()] = piece;
        }
    }

    /// 移动棋子（不检查规则），返回被吃的棋子
    pub fn move_piece(&mut self, from: Position, to: Position) -> Option<Piece> {
        let piece = self.get(from);
        let captured = self.get(to);
        self.set(from, None);
        self.set(to, piece);
        captured
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, side: Side) -> Option<Position> {
        self.pieces(side)
            .into_iter()
            .find(|(_, piece)| piece.piece_type == PieceType::King)
            .map(|(pos, _)| pos)
    }

    /// 获取指定阵营的所有棋子位置
    pub fn pieces(&self, side: Side) -> Vec<(Position, Piece)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.side == side)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Position, Piece)> {
        let mut result = Vec::new();
        for rank in 0..BOARD_HEIGHT {
            for file in 0..BOARD_WIDTH {
                let pos = Position::new_unchecked(file as u8, rank as u8);
                if let Some(piece) = self.get(pos) {
                    result.push((pos, piece));
                }
            }
        }
        result
    }

    /// 转换为 8x8 网格，grid[rank][file]
    pub fn to_grid(&self) -> [[Option<Piece>; BOARD_WIDTH]; BOARD_HEIGHT] {
        let mut grid = [[None; BOARD_WIDTH]; BOARD_HEIGHT];
        for (pos, piece) in self.all_pieces() {
            grid[pos.rank as usize][pos.file as usize] = Some(piece);
        }
        grid
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// 完整的棋盘状态（包含走子方、步数等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// 棋盘
    pub board: Board,
    /// 当前走子方
    pub current_turn: Side,
    /// 距上次吃子或兵走动的半回合数
    pub halfmove_clock: u32,
    /// 完整回合数（黑方走完后 +1）
    pub fullmove_number: u32,
}

impl BoardState {
    /// 创建初始状态
    pub fn initial() -> Self {
        Self {
            board: Board::initial(),
            current_turn: Side::White,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// 从棋盘创建状态
    pub fn from_board(board: Board, current_turn: Side) -> Self {
        Self {
            board,
            current_turn,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// 切换走子方
    pub fn switch_turn(&mut self) {
        self.current_turn = self.current_turn.opponent();
        if self.current_turn == Side::White {
            self.fullmove_number += 1;
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_board() {
        let board = Board::initial();

        assert_eq!(board.all_pieces().len(), 32);
        assert_eq!(
            board.get(Position::from_square("e1").unwrap()),
            Some(Piece::new(PieceType::King, Side::White))
        );
        assert_eq!(
            board.get(Position::from_square("d8").unwrap()),
            Some(Piece::new(PieceType::Queen, Side::Black))
        );
        assert_eq!(
            board.get(Position::from_square("g7").unwrap()),
            Some(Piece::new(PieceType::Pawn, Side::Black))
        );
        assert!(board.get(Position::from_square("e4").unwrap()).is_none());
    }

    #[test]
    fn test_move_piece() {
        let mut board = Board::initial();

        let from = Position::from_square("e2").unwrap();
        let to = Position::from_square("e4").unwrap();

        let captured = board.move_piece(from, to);
        assert!(captured.is_none());
        assert!(board.get(from).is_none());
        assert_eq!(board.get(to), Some(Piece::new(PieceType::Pawn, Side::White)));
    }

    #[test]
    fn test_find_king() {
        let board = Board::initial();
        assert_eq!(board.find_king(Side::White), Position::from_square("e1"));
        assert_eq!(board.find_king(Side::Black), Position::from_square("e8"));
        assert_eq!(Board::empty().find_king(Side::White), None);
    }

    #[test]
    fn test_grid_layout() {
        let grid = Board::initial().to_grid();
        assert_eq!(grid[0][0], Some(Piece::new(PieceType::Rook, Side::White)));
        assert_eq!(grid[7][4], Some(Piece::new(PieceType::King, Side::Black)));
        assert!(grid[3][3].is_none());
    }

    #[test]
    fn test_board_serde() {
        let board = Board::initial();
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(board, back);
    }
}
