//! 走法生成和验证
//!
//! 参考规则：标准棋子走法、将军与将死判断、兵到底线自动升变为后。
//! 不包含王车易位与吃过路兵。

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardState};
use crate::constants::BOARD_HEIGHT;
use crate::piece::{Piece, PieceType, Position, Side};

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KING_DIRECTIONS: [(i8, i8); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
    /// 被吃的棋子（如果有）
    pub captured: Option<Piece>,
    /// 升变后的棋子类型
    pub promotion: Option<PieceType>,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            captured: None,
            promotion: None,
        }
    }

    /// 创建带吃子的走法
    pub fn with_capture(from: Position, to: Position, captured: Piece) -> Self {
        Self {
            from,
            to,
            captured: Some(captured),
            promotion: None,
        }
    }

    /// 在棋盘上执行走法（不检查规则），返回被吃的棋子
    pub fn apply_to(&self, board: &mut Board) -> Option<Piece> {
        let captured = board.move_piece(self.from, self.to);
        if let Some(promotion) = self.promotion {
            if let Some(piece) = board.get(self.to) {
                board.set(self.to, Some(Piece::new(promotion, piece.side)));
            }
        }
        captured
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定阵营的所有伪合法走法（不考虑将军）
    pub fn generate_pseudo_legal(board: &Board, side: Side) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);

        for (pos, piece) in board.pieces(side) {
            Self::generate_piece_moves(board, pos, piece, &mut moves);
        }

        moves
    }

    /// 生成当前走子方的所有合法走法（过滤掉会导致被将军的走法）
    pub fn generate_legal(state: &BoardState) -> Vec<Move> {
        Self::generate_pseudo_legal(&state.board, state.current_turn)
            .into_iter()
            .filter(|mv| Self::is_safe(&state.board, mv, state.current_turn))
            .collect()
    }

    /// 生成指定位置棋子的合法走法
    pub fn generate_legal_from(state: &BoardState, from: Position) -> Vec<Move> {
        let Some(piece) = state.board.get(from) else {
            return Vec::new();
        };
        if piece.side != state.current_turn {
            return Vec::new();
        }

        let mut moves = Self::generate_pseudo_legal_from(&state.board, from);
        moves.retain(|mv| Self::is_safe(&state.board, mv, piece.side));
        moves
    }

    /// 生成指定位置棋子的伪合法走法（不检查王是否安全）
    pub fn generate_pseudo_legal_from(board: &Board, from: Position) -> Vec<Move> {
        let mut moves = Vec::new();
        if let Some(piece) = board.get(from) {
            Self::generate_piece_moves(board, from, piece, &mut moves);
        }
        moves
    }

    /// 走完后己方王是否安全
    fn is_safe(board: &Board, mv: &Move, side: Side) -> bool {
        let mut test_board = board.clone();
        mv.apply_to(&mut test_board);
        !Self::is_in_check(&test_board, side)
    }

    /// 生成指定棋子的所有伪合法走法
    fn generate_piece_moves(board: &Board, pos: Position, piece: Piece, moves: &mut Vec<Move>) {
        match piece.piece_type {
            PieceType::King => Self::generate_step_moves(board, pos, piece.side, &KING_DIRECTIONS, moves),
            PieceType::Knight => Self::generate_step_moves(board, pos, piece.side, &KNIGHT_OFFSETS, moves),
            PieceType::Rook => Self::generate_slide_moves(board, pos, piece.side, &ROOK_DIRECTIONS, moves),
            PieceType::Bishop => Self::generate_slide_moves(board, pos, piece.side, &BISHOP_DIRECTIONS, moves),
            PieceType::Queen => {
                Self::generate_slide_moves(board, pos, piece.side, &ROOK_DIRECTIONS, moves);
                Self::generate_slide_moves(board, pos, piece.side, &BISHOP_DIRECTIONS, moves);
            }
            PieceType::Pawn => Self::generate_pawn_moves(board, pos, piece.side, moves),
        }
    }

    /// 王、马：单步走法
    fn generate_step_moves(
        board: &Board,
        pos: Position,
        side: Side,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(df, dr) in offsets {
            if let Some(to) = pos.offset(df, dr) {
                Self::try_add_move(board, pos, to, side, moves);
            }
        }
    }

    /// 车、象、后：沿方向滑行直到被阻挡
    fn generate_slide_moves(
        board: &Board,
        pos: Position,
        side: Side,
        directions: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(df, dr) in directions {
            let mut current = pos;
            while let Some(to) = current.offset(df, dr) {
                let blocked = board.get(to).is_some();
                Self::try_add_move(board, pos, to, side, moves);
                if blocked {
                    break;
                }
                current = to;
            }
        }
    }

    /// 兵的走法
    fn generate_pawn_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        let forward = side.forward();
        let start_rank = match side {
            Side::White => 1,
            Side::Black => BOARD_HEIGHT as u8 - 2,
        };

        // 前进一格
        if let Some(one) = pos.offset(0, forward) {
            if board.get(one).is_none() {
                moves.push(Self::with_promotion(Move::new(pos, one), side));

                // 起始位置可以前进两格
                if pos.rank == start_rank {
                    if let Some(two) = pos.offset(0, forward * 2) {
                        if board.get(two).is_none() {
                            moves.push(Move::new(pos, two));
                        }
                    }
                }
            }
        }

        // 斜吃
        for df in [-1, 1] {
            if let Some(to) = pos.offset(df, forward) {
                if let Some(target) = board.get(to) {
                    if target.side != side {
                        moves.push(Self::with_promotion(Move::with_capture(pos, to, target), side));
                    }
                }
            }
        }
    }

    /// 兵到达底线时自动升变为后
    fn with_promotion(mut mv: Move, side: Side) -> Move {
        let last_rank = match side {
            Side::White => BOARD_HEIGHT as u8 - 1,
            Side::Black => 0,
        };
        if mv.to.rank == last_rank {
            mv.promotion = Some(PieceType::Queen);
        }
        mv
    }

    /// 尝试添加走法（检查目标位置是否可以移动）
    fn try_add_move(board: &Board, from: Position, to: Position, side: Side, moves: &mut Vec<Move>) {
        match board.get(to) {
            Some(target) if target.side != side => moves.push(Move::with_capture(from, to, target)),
            Some(_) => {}
            None => moves.push(Move::new(from, to)),
        }
    }

    /// 检查指定阵营是否被将军
    pub fn is_in_check(board: &Board, side: Side) -> bool {
        match board.find_king(side) {
            Some(king_pos) => Self::is_square_attacked(board, king_pos, side.opponent()),
            None => false,
        }
    }

    /// 检查指定位置是否被某一方攻击
    pub fn is_square_attacked(board: &Board, target: Position, by: Side) -> bool {
        board
            .pieces(by)
            .into_iter()
            .any(|(pos, piece)| Self::can_attack(board, pos, piece, target))
    }

    /// 检查棋子是否能攻击到目标位置
    fn can_attack(board: &Board, from: Position, piece: Piece, target: Position) -> bool {
        let df = target.file as i8 - from.file as i8;
        let dr = target.rank as i8 - from.rank as i8;

        match piece.piece_type {
            PieceType::King => from.chebyshev_distance(target) == 1,
            PieceType::Knight => (df.abs() == 1 && dr.abs() == 2) || (df.abs() == 2 && dr.abs() == 1),
            PieceType::Pawn => df.abs() == 1 && dr == piece.side.forward(),
            PieceType::Rook => (df == 0 || dr == 0) && Self::is_path_clear(board, from, target),
            PieceType::Bishop => df.abs() == dr.abs() && Self::is_path_clear(board, from, target),
            PieceType::Queen => from.is_aligned_with(target) && Self::is_path_clear(board, from, target),
        }
    }

    /// 检查两点之间（不含端点）是否没有棋子
    fn is_path_clear(board: &Board, from: Position, to: Position) -> bool {
        let Some((df, dr)) = from.line_direction(to) else {
            return false;
        };

        let mut current = from;
        while let Some(next) = current.offset(df, dr) {
            if next == to {
                return true;
            }
            if board.get(next).is_some() {
                return false;
            }
            current = next;
        }
        false
    }
}
