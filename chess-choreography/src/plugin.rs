//! Bevy 插件
//!
//! 把 [`BoardAnimator`] 接入 bevy 的帧循环：每帧推进动画，
//! 把实体根节点同步到场景里的 [`PieceRoot`]，并转发编排事件。

use std::collections::HashSet;

use bevy::prelude::*;
use tracing::debug;

use crate::animator::BoardAnimator;
use crate::assets::TemplateLibrary;
use crate::attributes::AttributeConfig;
use crate::choreographer::ChoreographyEvent;
use crate::config::{ChoreographyConfig, LoadedConfig};
use crate::entity::PieceId;
use crate::sequence::SequenceConfig;

/// 场景中棋子根节点对应的实体
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceRoot(pub PieceId);

/// 棋子动画插件
#[derive(Debug, Clone, Default)]
pub struct ChoreographyPlugin {
    pub config: ChoreographyConfig,
    pub attributes: AttributeConfig,
    pub sequences: SequenceConfig,
    pub templates: TemplateLibrary,
}

impl ChoreographyPlugin {
    pub fn new(loaded: LoadedConfig, templates: TemplateLibrary) -> Self {
        Self {
            config: loaded.choreography,
            attributes: loaded.attributes,
            sequences: loaded.sequences,
            templates,
        }
    }
}

impl Plugin for ChoreographyPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(BoardAnimator::new(
            self.config.clone(),
            self.attributes.clone(),
            self.sequences.clone(),
            self.templates.clone(),
        ))
        .add_message::<ChoreographyEvent>()
        .add_systems(
            Update,
            (
                advance_animator,
                spawn_piece_roots,
                sync_piece_roots,
                despawn_removed_pieces,
            )
                .chain(),
        );
    }
}

/// 推进一帧并转发事件
fn advance_animator(
    time: Res<Time>,
    mut animator: ResMut<BoardAnimator>,
    mut events: MessageWriter<ChoreographyEvent>,
) {
    animator.advance(time.delta_secs());
    for event in animator.drain_events() {
        events.write(event);
    }
}

/// 为还没有场景节点的棋子生成根节点
fn spawn_piece_roots(mut commands: Commands, animator: Res<BoardAnimator>, roots: Query<&PieceRoot>) {
    let existing: HashSet<PieceId> = roots.iter().map(|root| root.0).collect();
    for (id, transform) in animator.all_entity_roots() {
        if !existing.contains(&id) {
            commands.spawn((PieceRoot(id), transform));
        }
    }
}

/// 同步根节点变换
fn sync_piece_roots(animator: Res<BoardAnimator>, mut roots: Query<(&PieceRoot, &mut Transform)>) {
    for (root, mut transform) in &mut roots {
        if let Some(entity) = animator.entity(root.0) {
            if *transform != entity.root {
                *transform = entity.root;
            }
        }
    }
}

/// 移除已退场或已不在存储中的棋子节点
fn despawn_removed_pieces(
    mut commands: Commands,
    animator: Res<BoardAnimator>,
    mut events: MessageReader<ChoreographyEvent>,
    roots: Query<(Entity, &PieceRoot)>,
) {
    let removed: HashSet<PieceId> = events
        .read()
        .filter_map(|event| match event {
            ChoreographyEvent::PieceRemoved { piece } => Some(*piece),
            _ => None,
        })
        .collect();

    for (entity, root) in &roots {
        if removed.contains(&root.0) || animator.entity(root.0).is_none() {
            debug!("移除场景节点 {}", root.0);
            commands.entity(entity).despawn();
        }
    }
}
