//! 棋盘布局：棋盘坐标与世界坐标的换算

use bevy::math::{Quat, Vec3};
use protocol::{Position, Side, BOARD_HEIGHT, BOARD_WIDTH};

use crate::constants::DEFAULT_SQUARE_SIZE;

/// 棋盘布局
///
/// 棋盘中心位于 `origin`，a1 在 -x/+z 角，白方朝 -z 方向前进。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    /// 棋盘中心（世界坐标）
    pub origin: Vec3,
    /// 格子边长
    pub square_size: f32,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SQUARE_SIZE)
    }
}

impl BoardLayout {
    pub fn new(square_size: f32) -> Self {
        let square_size = if square_size.is_finite() && square_size > 0.0 {
            square_size
        } else {
            DEFAULT_SQUARE_SIZE
        };
        Self {
            origin: Vec3::ZERO,
            square_size,
        }
    }

    /// 格子中心的世界坐标
    pub fn board_to_world(&self, pos: Position) -> Vec3 {
        let half_w = (BOARD_WIDTH as f32 - 1.0) / 2.0;
        let half_h = (BOARD_HEIGHT as f32 - 1.0) / 2.0;
        self.origin
            + Vec3::new(
                (pos.file as f32 - half_w) * self.square_size,
                0.0,
                (half_h - pos.rank as f32) * self.square_size,
            )
    }

    /// 世界坐标所在的格子
    pub fn world_to_board(&self, point: Vec3) -> Option<Position> {
        let half_w = (BOARD_WIDTH as f32 - 1.0) / 2.0;
        let half_h = (BOARD_HEIGHT as f32 - 1.0) / 2.0;
        let relative = point - self.origin;
        let file = (relative.x / self.square_size + half_w).round();
        let rank = (half_h - relative.z / self.square_size).round();
        if !(0.0..BOARD_WIDTH as f32).contains(&file) || !(0.0..BOARD_HEIGHT as f32).contains(&rank) {
            return None;
        }
        Position::new(file as u8, rank as u8)
    }

    /// 格/秒 换算为世界单位/秒
    pub fn world_speed(&self, squares_per_sec: f32) -> f32 {
        squares_per_sec * self.square_size
    }
}

/// 从 `from` 看向 `to` 的朝向（绕 y 轴，模型正面为 +z）
///
/// 两点重合时返回 `None`。
pub fn facing(from: Vec3, to: Vec3) -> Option<Quat> {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    if dx.abs() < f32::EPSILON && dz.abs() < f32::EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(dx.atan2(dz)))
}

/// 棋子初始朝向：面向对方
pub fn base_facing(side: Side) -> Quat {
    match side {
        Side::White => Quat::from_rotation_y(std::f32::consts::PI),
        Side::Black => Quat::IDENTITY,
    }
}
