//! 棋子实体

use std::collections::HashMap;
use std::fmt;

use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use protocol::{PieceType, Position, Side};

use crate::assets::{Geometry, PieceTemplate};
use crate::attributes::VisualAttributes;
use crate::choreographer::AttackPlan;
use crate::mixer::{ActionId, AnimationMixer};

/// 棋子实体标识，创建后不变，不会复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piece#{}", self.0)
    }
}

/// 棋子的视觉状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PieceState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Dying,
    Dead,
}

impl PieceState {
    /// 是否还在棋盘上（可以被选中、可以走棋）
    pub fn is_alive(&self) -> bool {
        !matches!(self, PieceState::Dying | PieceState::Dead)
    }
}

/// 位移目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTarget {
    pub target: Vec3,
    /// 世界单位/秒
    pub speed: f32,
}

/// 转向目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTarget {
    pub target: Quat,
    /// 弧度/秒
    pub speed: f32,
}

/// 位移到达时要做的事
///
/// 只由逐帧插值在检测到到达时取出，且只取一次。
#[derive(Debug, Clone, PartialEq)]
pub enum Arrival {
    /// 回到待机
    Settle { token: u64 },
    /// 预移动结束，开始攻击序列
    BeginSequence { token: u64, plan: Box<AttackPlan> },
    /// 序列里的移动步骤到达，收尾由序列结束事件负责
    StepDone { token: u64 },
}

impl Arrival {
    pub fn token(&self) -> u64 {
        match self {
            Arrival::Settle { token }
            | Arrival::BeginSequence { token, .. }
            | Arrival::StepDone { token } => *token,
        }
    }
}

/// 棋子实体
#[derive(Debug, Clone)]
pub struct PieceEntity {
    pub id: PieceId,
    pub side: Side,
    pub piece_type: PieceType,
    /// 规则意义上的格子，走棋时立即更新
    pub position: Position,
    /// 视觉根节点
    pub root: Transform,
    /// 初始朝向，待机时恢复
    pub base_rotation: Quat,
    pub geometry: Geometry,
    pub visual: VisualAttributes,
    pub mixer: AnimationMixer,
    /// 小写片段名 → 动作
    pub clip_index: HashMap<String, ActionId>,
    pub active_action: Option<ActionId>,
    pub motion: Option<MotionTarget>,
    pub rotation: Option<RotationTarget>,
    pub on_arrive: Option<Arrival>,
    pub state: PieceState,
    /// 每次发出位移请求加一
    pub motion_token: u64,
    /// 每次走棋加一
    pub generation: u64,
    /// 首次攻击的热身动画是否已播放
    pub first_move_played: bool,
}

impl PieceEntity {
    /// 按模板创建实体，为每个片段建立动作
    pub fn new(
        id: PieceId,
        side: Side,
        piece_type: PieceType,
        position: Position,
        template: &PieceTemplate,
        visual: VisualAttributes,
        translation: Vec3,
        base_rotation: Quat,
    ) -> Self {
        let mut mixer = AnimationMixer::new();
        let mut clip_index = HashMap::new();
        for clip in &template.clips {
            let key = clip.name.trim().to_ascii_lowercase();
            let action = mixer.add_clip(clip.clone());
            // 同名片段保留第一个
            clip_index.entry(key).or_insert(action);
        }

        let root = Transform {
            translation,
            rotation: base_rotation,
            scale: Vec3::splat(visual.scale),
        };

        Self {
            id,
            side,
            piece_type,
            position,
            root,
            base_rotation,
            geometry: template.geometry.clone(),
            visual,
            mixer,
            clip_index,
            active_action: None,
            motion: None,
            rotation: None,
            on_arrive: None,
            state: PieceState::Idle,
            motion_token: 0,
            generation: 0,
            first_move_played: false,
        }
    }

    pub fn has_clip(&self, name: &str) -> bool {
        self.clip_index.contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn action_named(&self, name: &str) -> Option<ActionId> {
        self.clip_index.get(&name.trim().to_ascii_lowercase()).copied()
    }

    /// 当前动作的片段名
    pub fn active_clip_name(&self) -> Option<&str> {
        self.active_action
            .and_then(|id| self.mixer.action(id))
            .map(|action| action.name())
    }

    /// 发出新的位移请求，覆盖之前的请求和到达记录，返回新令牌
    ///
    /// `arrival` 接收新令牌，生成到达记录。
    pub fn set_motion(&mut self, target: Vec3, speed: f32, arrival: impl FnOnce(u64) -> Option<Arrival>) -> u64 {
        self.motion_token += 1;
        let token = self.motion_token;
        self.motion = Some(MotionTarget { target, speed });
        self.on_arrive = arrival(token);
        token
    }

    /// 取消位移，到达记录一并作废
    pub fn clear_motion(&mut self) {
        self.motion_token += 1;
        self.motion = None;
        self.on_arrive = None;
    }

    pub fn set_rotation(&mut self, target: Quat, speed: f32) {
        self.rotation = Some(RotationTarget { target, speed });
    }

    /// 开始新一步走棋，返回新的代数
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::base_facing;

    fn entity() -> PieceEntity {
        let template = PieceTemplate::new("pawn.glb")
            .with_clip("Idle", 2.0)
            .with_clip("walk", 1.0)
            .with_clip("IDLE", 3.0);
        PieceEntity::new(
            PieceId(1),
            Side::White,
            PieceType::Pawn,
            Position::from_square("e2").unwrap(),
            &template,
            VisualAttributes::default(),
            Vec3::ZERO,
            base_facing(Side::White),
        )
    }

    #[test]
    fn test_clip_index_is_case_insensitive() {
        let entity = entity();
        assert!(entity.has_clip("idle"));
        assert!(entity.has_clip(" Walk "));
        assert!(!entity.has_clip("attack"));
        // 重名时保留第一个
        let idle = entity.action_named("idle").unwrap();
        assert_eq!(entity.mixer.action(idle).unwrap().clip().duration, 2.0);
        assert_eq!(entity.root.scale, Vec3::splat(0.8));
    }

    #[test]
    fn test_new_motion_overwrites_arrival() {
        let mut entity = entity();
        let first = entity.set_motion(Vec3::X, 1.0, |token| Some(Arrival::Settle { token }));
        let second = entity.set_motion(Vec3::Z, 1.0, |token| Some(Arrival::StepDone { token }));

        assert!(second > first);
        assert_eq!(entity.on_arrive, Some(Arrival::StepDone { token: second }));
        assert_eq!(entity.motion.unwrap().target, Vec3::Z);

        entity.clear_motion();
        assert!(entity.on_arrive.is_none());
        assert!(!entity.is_moving());
        assert!(entity.motion_token > second);
    }

    #[test]
    fn test_state_alive() {
        assert!(PieceState::Idle.is_alive());
        assert!(PieceState::Attacking.is_alive());
        assert!(!PieceState::Dying.is_alive());
        assert!(!PieceState::Dead.is_alive());
    }
}
