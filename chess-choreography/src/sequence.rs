//! 攻击序列
//!
//! 配置文档结构：
//!
//! ```json
//! {
//!   "default": [
//!     { "target": "attacker", "clip": "attack", "at": 0 },
//!     { "target": "victim", "clip": "hit", "at": 300 },
//!     { "target": "victim", "clip": "die", "at": 700 }
//!   ],
//!   "overrides": {
//!     "white": { "queen": { "pawn": [ ... ] } }
//!   }
//! }
//! ```
//!
//! 步骤不要求按 `at` 排序，结束时间必须扫描全部步骤得出。

use std::collections::HashMap;

use protocol::{PieceType, Side};
use serde::{Deserialize, Serialize};

/// 步骤作用的棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceTarget {
    Attacker,
    Victim,
}

/// 序列中的一个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    pub target: SequenceTarget,
    /// 动画片段名称
    pub clip: String,
    /// 相对序列开始的偏移（毫秒）
    #[serde(default)]
    pub at: f64,
    /// 攻击方在这一步移动到目标格
    #[serde(default, rename = "move")]
    pub movement: bool,
    /// 移动速度（格/秒），缺省时使用棋子的移动速度
    #[serde(default)]
    pub speed: Option<f32>,
    /// 移动恰好在片段播放完时到达
    #[serde(default, alias = "stopAtClipEnd")]
    pub stop_on_clip_end: bool,
}

impl SequenceStep {
    pub fn new(target: SequenceTarget, clip: impl Into<String>, at: f64) -> Self {
        Self {
            target,
            clip: clip.into(),
            at,
            movement: false,
            speed: None,
            stop_on_clip_end: false,
        }
    }

    /// 攻击方的移动步骤
    pub fn attacker_move(clip: impl Into<String>, at: f64, speed: Option<f32>, stop_on_clip_end: bool) -> Self {
        Self {
            movement: true,
            speed,
            stop_on_clip_end,
            ..Self::new(SequenceTarget::Attacker, clip, at)
        }
    }

    /// 是否为攻击方的移动步骤
    pub fn is_attacker_move(&self) -> bool {
        self.movement && self.target == SequenceTarget::Attacker
    }

    /// 偏移毫秒数，负数和非有限值视为 0
    pub fn offset_ms(&self) -> f64 {
        if self.at.is_finite() {
            self.at.max(0.0)
        } else {
            0.0
        }
    }
}

/// 攻击序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttackSequence {
    steps: Vec<SequenceStep>,
}

impl AttackSequence {
    pub fn new(steps: Vec<SequenceStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceStep> {
        self.steps.iter()
    }

    /// 序列结束时间：所有步骤 `偏移 + 时长` 的最大值
    pub fn end_ms(&self, duration_ms: impl Fn(&SequenceStep) -> f64) -> f64 {
        Self::max_end(self.steps.iter(), duration_ms)
    }

    /// 被吃方的结束时间：只统计作用于被吃方的步骤
    pub fn victim_end_ms(&self, duration_ms: impl Fn(&SequenceStep) -> f64) -> f64 {
        Self::max_end(
            self.steps.iter().filter(|s| s.target == SequenceTarget::Victim),
            duration_ms,
        )
    }

    fn max_end<'a>(
        steps: impl Iterator<Item = &'a SequenceStep>,
        duration_ms: impl Fn(&SequenceStep) -> f64,
    ) -> f64 {
        steps
            .map(|step| step.offset_ms() + duration_ms(step).max(0.0))
            .fold(0.0, f64::max)
    }
}

impl<'a> IntoIterator for &'a AttackSequence {
    type Item = &'a SequenceStep;
    type IntoIter = std::slice::Iter<'a, SequenceStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// 攻击序列配置文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// 没有专门配置时使用的序列
    pub default: AttackSequence,
    /// 阵营 → 攻击方类型 → 被吃方类型
    pub overrides: HashMap<String, HashMap<String, HashMap<String, AttackSequence>>>,
}

impl SequenceConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// 忽略大小写查找
fn find_key<'a, V>(map: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    map.iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// 序列解析器
#[derive(Debug, Clone, Default)]
pub struct SequenceResolver {
    config: SequenceConfig,
}

impl SequenceResolver {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// 查找攻击序列
    ///
    /// 先查阵营专属的 攻击方 → 被吃方 配置（即使配置为空列表也采用），
    /// 否则返回默认序列；都没有配置时返回空序列。
    pub fn resolve(&self, attacker: PieceType, victim: PieceType, attacker_side: Side) -> AttackSequence {
        find_key(&self.config.overrides, attacker_side.name())
            .and_then(|by_attacker| find_key(by_attacker, attacker.name()))
            .and_then(|by_victim| find_key(by_victim, victim.name()))
            .unwrap_or(&self.config.default)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver(value: serde_json::Value) -> SequenceResolver {
        SequenceResolver::new(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_empty_without_config() {
        let resolver = SequenceResolver::default();
        assert!(resolver
            .resolve(PieceType::Queen, PieceType::Pawn, Side::White)
            .is_empty());
    }

    #[test]
    fn test_override_then_default() {
        let resolver = resolver(json!({
            "default": [ { "target": "attacker", "clip": "attack", "at": 0 } ],
            "overrides": {
                "White": { "Queen": { "pawn": [
                    { "target": "victim", "clip": "die", "at": 400 },
                    { "target": "attacker", "clip": "attack", "at": 0 }
                ] } }
            }
        }));

        let special = resolver.resolve(PieceType::Queen, PieceType::Pawn, Side::White);
        assert_eq!(special.len(), 2);
        assert_eq!(special.steps()[0].clip, "die");

        // 阵营不匹配时回退到默认序列
        let fallback = resolver.resolve(PieceType::Queen, PieceType::Pawn, Side::Black);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback.steps()[0].target, SequenceTarget::Attacker);
    }

    #[test]
    fn test_explicit_empty_override() {
        let resolver = resolver(json!({
            "default": [ { "target": "attacker", "clip": "attack" } ],
            "overrides": { "black": { "knight": { "rook": [] } } }
        }));
        assert!(resolver
            .resolve(PieceType::Knight, PieceType::Rook, Side::Black)
            .is_empty());
    }

    #[test]
    fn test_step_fields() {
        let step: SequenceStep = serde_json::from_value(json!({
            "target": "attacker",
            "clip": "lunge",
            "at": 150,
            "move": true,
            "speed": 6.5,
            "stopOnClipEnd": true
        }))
        .unwrap();
        assert!(step.is_attacker_move());
        assert_eq!(step.speed, Some(6.5));
        assert!(step.stop_on_clip_end);
        assert_eq!(step.offset_ms(), 150.0);

        let negative = SequenceStep::new(SequenceTarget::Victim, "hit", -20.0);
        assert_eq!(negative.offset_ms(), 0.0);
    }

    #[test]
    fn test_end_times_scan_unsorted_steps() {
        let sequence = AttackSequence::new(vec![
            SequenceStep::new(SequenceTarget::Victim, "die", 700.0),
            SequenceStep::new(SequenceTarget::Attacker, "attack", 0.0),
            SequenceStep::new(SequenceTarget::Victim, "hit", 300.0),
            SequenceStep::new(SequenceTarget::Attacker, "taunt", 900.0),
        ]);
        let duration = |step: &SequenceStep| match step.clip.as_str() {
            "die" => 1000.0,
            "taunt" => 500.0,
            _ => 400.0,
        };

        assert_eq!(sequence.end_ms(duration), 1700.0);
        assert_eq!(sequence.victim_end_ms(duration), 1700.0);
        assert_eq!(AttackSequence::default().end_ms(duration), 0.0);
    }
}
