//! 棋子模板
//!
//! 模型和动画片段由外部加载器解析，这里只保存句柄和片段时长。

use std::collections::HashMap;

use protocol::{PieceType, Side};

/// 动画片段
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// 时长（秒）
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
        }
    }
}

/// 占位几何体形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderShape {
    Cylinder,
    Cone,
    Box,
    Sphere,
}

/// 棋子几何体
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// 外部加载的模型
    Model(String),
    /// 没有模型时生成的占位形状
    Placeholder { shape: PlaceholderShape, height: f32 },
}

/// 某个阵营某种棋子的模板
#[derive(Debug, Clone, PartialEq)]
pub struct PieceTemplate {
    pub geometry: Geometry,
    pub clips: Vec<AnimationClip>,
}

impl PieceTemplate {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            geometry: Geometry::Model(model.into()),
            clips: Vec::new(),
        }
    }

    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.clips.push(AnimationClip::new(name, duration));
        self
    }

    /// 占位模板：按棋子类型区分形状和高度，没有动画
    pub fn placeholder(piece_type: PieceType) -> Self {
        let (shape, height) = match piece_type {
            PieceType::King => (PlaceholderShape::Cylinder, 1.0),
            PieceType::Queen => (PlaceholderShape::Cone, 0.9),
            PieceType::Rook => (PlaceholderShape::Box, 0.6),
            PieceType::Bishop => (PlaceholderShape::Cone, 0.7),
            PieceType::Knight => (PlaceholderShape::Box, 0.65),
            PieceType::Pawn => (PlaceholderShape::Sphere, 0.45),
        };
        Self {
            geometry: Geometry::Placeholder { shape, height },
            clips: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.geometry, Geometry::Placeholder { .. })
    }
}

/// 模板库，按 (阵营, 类型) 索引
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: HashMap<(Side, PieceType), PieceTemplate>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, side: Side, piece_type: PieceType, template: PieceTemplate) {
        self.templates.insert((side, piece_type), template);
    }

    pub fn with(mut self, side: Side, piece_type: PieceType, template: PieceTemplate) -> Self {
        self.insert(side, piece_type, template);
        self
    }

    pub fn get(&self, side: Side, piece_type: PieceType) -> Option<&PieceTemplate> {
        self.templates.get(&(side, piece_type))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_lookup() {
        let library = TemplateLibrary::new().with(
            Side::White,
            PieceType::Queen,
            PieceTemplate::new("queen_white.glb").with_clip("Idle", 2.0).with_clip("attack", 0.8),
        );

        let template = library.get(Side::White, PieceType::Queen).unwrap();
        assert_eq!(template.clips.len(), 2);
        assert!(!template.is_placeholder());
        assert!(library.get(Side::Black, PieceType::Queen).is_none());
    }

    #[test]
    fn test_clip_duration_sanitized() {
        assert_eq!(AnimationClip::new("broken", f32::NAN).duration, 0.0);
        assert_eq!(AnimationClip::new("reverse", -1.0).duration, 0.0);
    }

    #[test]
    fn test_placeholder() {
        let template = PieceTemplate::placeholder(PieceType::Pawn);
        assert!(template.is_placeholder());
        assert!(template.clips.is_empty());
    }
}
