//! 国际象棋棋子动画编排
//!
//! 负责棋子实体的视觉状态机、攻击序列的时间线调度、逐帧位移/旋转插值，
//! 以及按棋子类型和阵营解析动画片段、速度、材质等配置。
//!
//! 规则判断、场景构建、资源加载不在本库范围内，只通过接口交互。

pub mod animator;
pub mod assets;
pub mod attributes;
pub mod choreographer;
pub mod clips;
pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod layout;
pub mod mixer;
pub mod motion;
pub mod plugin;
pub mod sequence;
pub mod store;
pub mod timer;

pub use animator::BoardAnimator;
pub use assets::{AnimationClip, Geometry, PieceTemplate, PlaceholderShape, TemplateLibrary};
pub use attributes::{AttributeConfig, AttributeResolver, MaterialAttributes, VisualAttributes};
pub use choreographer::{ChoreographyEvent, Choreographer};
pub use clips::ClipKind;
pub use config::{ChoreographyConfig, ConfigLoader, ConfigPaths, LightingConfig, LoadedConfig};
pub use entity::{PieceEntity, PieceId, PieceState};
pub use error::{ChoreographyError, Result};
pub use layout::BoardLayout;
pub use plugin::{ChoreographyPlugin, PieceRoot};
pub use sequence::{AttackSequence, SequenceConfig, SequenceResolver, SequenceStep, SequenceTarget};
pub use store::{PieceStore, SpawnContext};
pub use timer::TimerQueue;
