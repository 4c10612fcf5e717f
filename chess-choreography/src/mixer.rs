//! 动画混合器
//!
//! 每个棋子实体持有一个混合器。每个片段对应一个动作，动作记录播放时间、
//! 时间缩放、权重和淡入淡出状态；`update` 由逐帧插值统一推进。

use std::fmt;

use crate::assets::AnimationClip;

/// 动作句柄（混合器内的下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// 循环方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// 无限循环
    #[default]
    Repeat,
    /// 播放一次并停在最后一帧
    Once,
}

/// 权重渐变
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).min(1.0);
        self.from + (self.to - self.from) * t
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// 动画动作
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationAction {
    clip: AnimationClip,
    time: f32,
    time_scale: f32,
    weight: f32,
    loop_mode: LoopMode,
    running: bool,
    enabled: bool,
    fade: Option<Fade>,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 0.0,
            loop_mode: LoopMode::Repeat,
            running: false,
            enabled: false,
            fade: None,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    /// 当前播放时间（秒）
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// 是否参与混合（包括停在最后一帧的单次动作）
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 时间是否还在推进
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 单次动作是否已播完
    pub fn is_finished(&self) -> bool {
        self.enabled && !self.running && self.loop_mode == LoopMode::Once
    }

    /// 按时间缩放折算后的时长（秒）
    pub fn effective_duration(&self) -> f32 {
        if self.time_scale > 0.0 {
            self.clip.duration / self.time_scale
        } else {
            self.clip.duration
        }
    }

    fn advance(&mut self, dt: f32) {
        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += dt;
            self.weight = fade.weight();
            if fade.is_done() {
                let to = fade.to;
                self.fade = None;
                if to <= 0.0 {
                    self.halt();
                    return;
                }
            }
        }

        if !self.running {
            return;
        }

        self.time += dt * self.time_scale;
        let duration = self.clip.duration;
        match self.loop_mode {
            LoopMode::Repeat if duration > 0.0 => self.time %= duration,
            LoopMode::Repeat => self.time = 0.0,
            LoopMode::Once if self.time >= duration => {
                self.time = duration;
                self.running = false;
            }
            LoopMode::Once => {}
        }
    }

    fn halt(&mut self) {
        self.running = false;
        self.enabled = false;
        self.weight = 0.0;
        self.fade = None;
    }
}

/// 动画混合器
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为片段创建动作
    pub fn add_clip(&mut self, clip: AnimationClip) -> ActionId {
        self.actions.push(AnimationAction::new(clip));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &AnimationAction)> {
        self.actions.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    /// 从头播放，`fade_in` 大于 0 时从静音淡入
    pub fn play(&mut self, id: ActionId, time_scale: f32, loop_mode: LoopMode, fade_in: f32) {
        let Some(action) = self.actions.get_mut(id.0) else {
            return;
        };
        action.time = 0.0;
        action.time_scale = if time_scale.is_finite() && time_scale > 0.0 {
            time_scale
        } else {
            1.0
        };
        action.loop_mode = loop_mode;
        action.running = true;
        action.enabled = true;
        if fade_in > 0.0 {
            action.weight = 0.0;
            action.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                duration: fade_in,
                elapsed: 0.0,
            });
        } else {
            action.weight = 1.0;
            action.fade = None;
        }
    }

    /// 淡出后停止
    pub fn fade_out(&mut self, id: ActionId, duration: f32) {
        let Some(action) = self.actions.get_mut(id.0) else {
            return;
        };
        if !action.enabled {
            return;
        }
        if duration <= 0.0 {
            action.halt();
            return;
        }
        action.fade = Some(Fade {
            from: action.weight,
            to: 0.0,
            duration,
            elapsed: 0.0,
        });
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.halt();
        }
    }

    /// 推进所有动作
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        for action in self.actions.iter_mut().filter(|a| a.enabled) {
            action.advance(dt);
        }
    }

    /// 当前参与混合的动作
    pub fn enabled_actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.actions()
            .filter(|(_, a)| a.enabled)
            .map(|(id, _)| id)
    }
}
