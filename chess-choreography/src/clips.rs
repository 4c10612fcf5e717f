//! 动画片段选择
//!
//! 逻辑片段名（`walk`、`attack`、`hit-from-queen` ...）解析为 [`ClipKind`]，
//! 再按 "限定攻击方的变体 → 原名 → 别名" 的顺序找到实体上可播放的动作。

use std::time::Duration;

use protocol::PieceType;
use tracing::debug;

use crate::attributes::AttributeResolver;
use crate::constants::LOOP_CLIP_KEYWORDS;
use crate::entity::PieceEntity;
use crate::mixer::{ActionId, LoopMode};

/// 片段类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Idle,
    Walk,
    Attack,
    Ready,
    Hit,
    Die,
    /// 被指定类型的棋子击中
    HitFrom(PieceType),
    /// 被指定类型的棋子吃掉
    DieFrom(PieceType),
    /// 远程棋子第一次攻击前的热身
    FirstMove,
    /// 其它自定义片段（小写）
    Named(String),
}

impl ClipKind {
    /// 解析片段名，忽略大小写
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "idle" => return ClipKind::Idle,
            "walk" | "move" => return ClipKind::Walk,
            "attack" => return ClipKind::Attack,
            "ready" => return ClipKind::Ready,
            "hit" => return ClipKind::Hit,
            "die" => return ClipKind::Die,
            "first-move" | "firstmove" | "first_move" => return ClipKind::FirstMove,
            _ => {}
        }

        if let Some(t) = name.strip_prefix("hit-from-").and_then(PieceType::from_name) {
            return ClipKind::HitFrom(t);
        }
        if let Some(t) = name.strip_prefix("die-from-").and_then(PieceType::from_name) {
            return ClipKind::DieFrom(t);
        }
        ClipKind::Named(name)
    }

    /// 规范名称
    pub fn name(&self) -> String {
        match self {
            ClipKind::Idle => "idle".to_string(),
            ClipKind::Walk => "walk".to_string(),
            ClipKind::Attack => "attack".to_string(),
            ClipKind::Ready => "ready".to_string(),
            ClipKind::Hit => "hit".to_string(),
            ClipKind::Die => "die".to_string(),
            ClipKind::HitFrom(t) => format!("hit-from-{}", t.name()),
            ClipKind::DieFrom(t) => format!("die-from-{}", t.name()),
            ClipKind::FirstMove => "first-move".to_string(),
            ClipKind::Named(name) => name.clone(),
        }
    }

    /// 按优先级列出要尝试的片段名
    pub fn candidates(&self, attacker: Option<PieceType>) -> Vec<String> {
        match self {
            ClipKind::Hit | ClipKind::Die => {
                let base = self.name();
                let mut out = Vec::with_capacity(2);
                if let Some(attacker) = attacker {
                    out.push(format!("{}-from-{}", base, attacker.name()));
                }
                out.push(base);
                out
            }
            ClipKind::HitFrom(_) => vec![self.name(), "hit".to_string()],
            ClipKind::DieFrom(_) => vec![self.name(), "die".to_string()],
            ClipKind::Walk => vec!["walk".to_string(), "move".to_string()],
            ClipKind::FirstMove => vec![
                "first-move".to_string(),
                "firstmove".to_string(),
                "first_move".to_string(),
            ],
            other => vec![other.name()],
        }
    }

    /// 是否循环播放
    pub fn loops(&self) -> bool {
        match self {
            ClipKind::Idle | ClipKind::Walk => true,
            ClipKind::Named(name) => name_loops(name),
            _ => false,
        }
    }
}

impl std::fmt::Display for ClipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

fn name_loops(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    LOOP_CLIP_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// 找到实体上对应的动作
pub fn resolve_action(entity: &PieceEntity, kind: &ClipKind, attacker: Option<PieceType>) -> Option<ActionId> {
    kind.candidates(attacker)
        .iter()
        .find_map(|name| entity.action_named(name))
}

/// 开始播放动作，返回折算时间缩放后的时长（秒）
///
/// 当前有其它动作时交叉淡入淡出；同一个动作重新开始时不淡入。
pub fn start_action(entity: &mut PieceEntity, action: ActionId, time_scale: f32, cross_fade: f32) -> f32 {
    let Some(name) = entity.mixer.action(action).map(|a| a.name().to_string()) else {
        return 0.0;
    };
    let loop_mode = if ClipKind::parse(&name).loops() || name_loops(&name) {
        LoopMode::Repeat
    } else {
        LoopMode::Once
    };

    let fade_in = match entity.active_action {
        Some(previous) if previous == action => 0.0,
        Some(previous) => {
            entity.mixer.fade_out(previous, cross_fade);
            cross_fade
        }
        None => cross_fade,
    };
    entity.mixer.play(action, time_scale, loop_mode, fade_in);
    entity.active_action = Some(action);

    entity
        .mixer
        .action(action)
        .map(|a| a.effective_duration())
        .unwrap_or(0.0)
}

/// 按类型播放片段
///
/// 片段不存在时记录日志并返回 `None`，调用方按零时长处理。
pub fn play_clip(
    entity: &mut PieceEntity,
    kind: &ClipKind,
    attacker: Option<PieceType>,
    attributes: &AttributeResolver,
    cross_fade: f32,
) -> Option<Duration> {
    let Some(action) = resolve_action(entity, kind, attacker) else {
        debug!("{} ({} {}) 没有动画片段 {}", entity.id, entity.side, entity.piece_type, kind);
        return None;
    };
    let time_scale = attributes.resolve_animation_time_scale(entity.piece_type, entity.side);
    let secs = start_action(entity, action, time_scale, cross_fade);
    Some(Duration::from_secs_f32(secs.max(0.0)))
}

/// 淡出当前动作
pub fn stop_active(entity: &mut PieceEntity, fade: f32) {
    if let Some(active) = entity.active_action.take() {
        entity.mixer.fade_out(active, fade);
    }
}
