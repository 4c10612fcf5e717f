//! 棋子视觉属性解析
//!
//! 配置文档结构：
//!
//! ```json
//! {
//!   "defaults": { "scale": 0.8, "color": { "white": "#f0e6d2", "black": "0x202020" } },
//!   "overrides": {
//!     "queen": { "scale": { "white": 1.1, "default": 1.0 }, "moveSpeed": 6 }
//!   }
//! }
//! ```
//!
//! 每个字段既可以是统一值，也可以是按阵营区分的对象（`white` / `black`，
//! 以及可选的 `default`）。解析顺序：
//! 类型覆盖的阵营值 → 类型覆盖的通用值 → 默认的阵营值 → 默认的通用值 → 内置常量。

use std::collections::HashMap;

use protocol::{PieceType, Side};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_ANIMATION_TIME_SCALE, DEFAULT_MOVE_SPEED, DEFAULT_SCALE};

/// 阵营对象里表示"不分阵营"的键
const GENERIC_KEYS: [&str; 2] = ["default", "all"];

/// 一组可覆盖的属性字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeBlock {
    pub scale: Option<Value>,
    pub color: Option<Value>,
    pub material: Option<Value>,
    #[serde(alias = "speed")]
    pub move_speed: Option<Value>,
    #[serde(alias = "timeScale")]
    pub animation_time_scale: Option<Value>,
}

/// 属性字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Scale,
    Color,
    Material,
    MoveSpeed,
    AnimationTimeScale,
}

impl AttributeBlock {
    fn field(&self, field: Field) -> Option<&Value> {
        match field {
            Field::Scale => self.scale.as_ref(),
            Field::Color => self.color.as_ref(),
            Field::Material => self.material.as_ref(),
            Field::MoveSpeed => self.move_speed.as_ref(),
            Field::AnimationTimeScale => self.animation_time_scale.as_ref(),
        }
    }
}

/// 棋子属性配置文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeConfig {
    /// 全局默认值
    pub defaults: AttributeBlock,
    /// 按棋子类型覆盖，键不区分大小写
    pub overrides: HashMap<String, AttributeBlock>,
}

impl AttributeConfig {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// 查找类型覆盖
    fn override_for(&self, piece_type: PieceType) -> Option<&AttributeBlock> {
        self.overrides
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(piece_type.name()))
            .map(|(_, block)| block)
    }

    /// 按优先级列出某个字段的候选值
    fn candidates(&self, piece_type: PieceType, side: Side, field: Field) -> Vec<&Value> {
        let mut out = Vec::with_capacity(4);
        let blocks = [self.override_for(piece_type), Some(&self.defaults)];

        for value in blocks.into_iter().flatten().filter_map(|b| b.field(field)) {
            if is_side_keyed(value) {
                out.extend(side_entry(value, side.name()));
                out.extend(GENERIC_KEYS.iter().find_map(|k| side_entry(value, k)));
            } else {
                out.push(value);
            }
        }

        out
    }
}

/// 是否为按阵营区分的对象
fn is_side_keyed(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if !map.is_empty() => map.keys().all(|key| {
            let key = key.to_ascii_lowercase();
            key == Side::White.name() || key == Side::Black.name() || GENERIC_KEYS.contains(&key.as_str())
        }),
        _ => false,
    }
}

/// 忽略大小写取对象成员
fn side_entry<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn finite(value: &Value) -> Option<f32> {
    value.as_f64().map(|n| n as f32).filter(|n| n.is_finite())
}

fn positive(value: &Value) -> Option<f32> {
    finite(value).filter(|n| *n > 0.0)
}

fn unit(value: &Value) -> Option<f32> {
    finite(value).map(|n| n.clamp(0.0, 1.0))
}

fn non_negative(value: &Value) -> Option<f32> {
    finite(value).filter(|n| *n >= 0.0)
}

/// 解析颜色：0..=0xFFFFFF 的数字，或 `#RRGGBB` / `0xRRGGBB` 字符串
pub fn parse_color(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().filter(|c| *c <= 0xFF_FFFF).map(|c| c as u32),
        Value::String(s) => {
            let s = s.trim();
            let hex = s
                .strip_prefix('#')
                .or_else(|| s.strip_prefix("0x"))
                .or_else(|| s.strip_prefix("0X"))?;
            if hex.len() != 6 {
                return None;
            }
            u32::from_str_radix(hex, 16).ok()
        }
        _ => None,
    }
}

/// 材质参数，缺省字段表示不覆盖
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialAttributes {
    /// 粗糙度 [0, 1]
    pub roughness: Option<f32>,
    /// 金属度 [0, 1]
    pub metalness: Option<f32>,
    /// 自发光颜色
    pub emissive: Option<u32>,
    /// 自发光强度
    pub emissive_intensity: Option<f32>,
}

/// 棋子外观
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualAttributes {
    pub scale: f32,
    pub color: Option<u32>,
    pub material: MaterialAttributes,
}

impl Default for VisualAttributes {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            color: None,
            material: MaterialAttributes::default(),
        }
    }
}

/// 属性解析器
///
/// 没有加载配置时所有解析都返回内置默认值，不会失败。
#[derive(Debug, Clone, Default)]
pub struct AttributeResolver {
    config: AttributeConfig,
}

impl AttributeResolver {
    pub fn new(config: AttributeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttributeConfig {
        &self.config
    }

    /// 按优先级取第一个有效值
    fn lookup<T>(
        &self,
        piece_type: PieceType,
        side: Side,
        field: Field,
        accept: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        self.config
            .candidates(piece_type, side, field)
            .into_iter()
            .find_map(accept)
    }

    /// 材质的单个通道
    fn material_channel<T>(
        &self,
        piece_type: PieceType,
        side: Side,
        names: &[&str],
        accept: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        self.lookup(piece_type, side, Field::Material, |material| {
            names
                .iter()
                .find_map(|name| side_entry(material, name))
                .and_then(&accept)
        })
    }

    pub fn resolve_scale(&self, piece_type: PieceType, side: Side) -> f32 {
        self.lookup(piece_type, side, Field::Scale, positive)
            .unwrap_or(DEFAULT_SCALE)
    }

    /// 颜色覆盖，`None` 表示使用模型自带颜色
    pub fn resolve_color(&self, piece_type: PieceType, side: Side) -> Option<u32> {
        self.lookup(piece_type, side, Field::Color, parse_color)
    }

    pub fn resolve_material(&self, piece_type: PieceType, side: Side) -> MaterialAttributes {
        MaterialAttributes {
            roughness: self.material_channel(piece_type, side, &["roughness"], unit),
            metalness: self.material_channel(piece_type, side, &["metalness"], unit),
            emissive: self.material_channel(piece_type, side, &["emissive"], parse_color),
            emissive_intensity: self.material_channel(
                piece_type,
                side,
                &["emissiveIntensity", "emissive_intensity"],
                non_negative,
            ),
        }
    }

    /// 移动速度（格/秒）
    pub fn resolve_move_speed(&self, piece_type: PieceType, side: Side) -> f32 {
        self.lookup(piece_type, side, Field::MoveSpeed, positive)
            .unwrap_or(DEFAULT_MOVE_SPEED)
    }

    pub fn resolve_animation_time_scale(&self, piece_type: PieceType, side: Side) -> f32 {
        self.lookup(piece_type, side, Field::AnimationTimeScale, positive)
            .unwrap_or(DEFAULT_ANIMATION_TIME_SCALE)
    }

    /// 创建实体时一次性解析外观
    pub fn resolve_visual(&self, piece_type: PieceType, side: Side) -> VisualAttributes {
        VisualAttributes {
            scale: self.resolve_scale(piece_type, side),
            color: self.resolve_color(piece_type, side),
            material: self.resolve_material(piece_type, side),
        }
    }
}
