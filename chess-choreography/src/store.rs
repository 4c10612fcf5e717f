//! 棋子实体存储
//!
//! 同时按标识和按格子索引。格子索引里的每一项都指向一个存在的实体，
//! 且该实体的 `position` 就是这个格子；被吃的棋子在退场期间仍在标识索引里，
//! 但已经不占格子。

use std::collections::HashMap;

use bevy::transform::components::Transform;
use protocol::{PieceType, Position, Side};
use tracing::{info, warn};

use crate::assets::{PieceTemplate, TemplateLibrary};
use crate::attributes::AttributeResolver;
use crate::entity::{PieceEntity, PieceId};
use crate::error::{ChoreographyError, Result};
use crate::layout::{base_facing, BoardLayout};

/// 创建实体所需的外部资源
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext<'a> {
    pub templates: &'a TemplateLibrary,
    pub attributes: &'a AttributeResolver,
    pub layout: &'a BoardLayout,
}

/// 棋子实体存储
#[derive(Debug, Default)]
pub struct PieceStore {
    entities: HashMap<PieceId, PieceEntity>,
    squares: HashMap<Position, PieceId>,
    next_id: u32,
}

impl PieceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空所有实体，标识继续递增不复用
    pub fn clear(&mut self) {
        self.entities.clear();
        self.squares.clear();
    }

    /// 创建实体
    ///
    /// 模板缺失时使用占位形状。格子已被占用时返回错误。
    pub fn create(
        &mut self,
        side: Side,
        piece_type: PieceType,
        position: Position,
        ctx: SpawnContext<'_>,
    ) -> Result<PieceId> {
        if self.squares.contains_key(&position) {
            return Err(ChoreographyError::SquareOccupied(position.square_name()));
        }

        let placeholder;
        let template = match ctx.templates.get(side, piece_type) {
            Some(template) => template,
            None => {
                warn!("缺少 {} {} 的模板，使用占位形状", side, piece_type);
                placeholder = PieceTemplate::placeholder(piece_type);
                &placeholder
            }
        };

        self.next_id += 1;
        let id = PieceId(self.next_id);
        let entity = PieceEntity::new(
            id,
            side,
            piece_type,
            position,
            template,
            ctx.attributes.resolve_visual(piece_type, side),
            ctx.layout.board_to_world(position),
            base_facing(side),
        );

        self.entities.insert(id, entity);
        self.squares.insert(position, id);
        Ok(id)
    }

    pub fn get(&self, id: PieceId) -> Option<&PieceEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: PieceId) -> Option<&mut PieceEntity> {
        self.entities.get_mut(&id)
    }

    /// 占据格子的实体
    pub fn by_square(&self, position: Position) -> Option<&PieceEntity> {
        self.id_at(position).and_then(|id| self.entities.get(&id))
    }

    pub fn id_at(&self, position: Position) -> Option<PieceId> {
        self.squares.get(&position).copied()
    }

    /// 把实体登记到新格子
    ///
    /// 旧格子只有仍指向该实体时才清除；新格子上原来的登记被顶替。
    pub fn relocate(&mut self, id: PieceId, position: Position) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(ChoreographyError::UnknownPiece(id))?;

        let old = entity.position;
        if self.squares.get(&old) == Some(&id) {
            self.squares.remove(&old);
        }
        entity.position = position;

        if let Some(displaced) = self.squares.insert(position, id) {
            if displaced != id {
                info!("{} 让出格子 {}", displaced, position);
            }
        }
        Ok(())
    }

    /// 清除格子登记，实体本身保留
    pub fn vacate(&mut self, position: Position) -> Option<PieceId> {
        self.squares.remove(&position)
    }

    /// 移除实体
    pub fn remove(&mut self, id: PieceId) -> Option<PieceEntity> {
        let entity = self.entities.remove(&id)?;
        if self.squares.get(&entity.position) == Some(&id) {
            self.squares.remove(&entity.position);
        }
        Some(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PieceEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PieceEntity> {
        self.entities.values_mut()
    }

    /// 所有实体标识，按创建顺序
    pub fn ids(&self) -> Vec<PieceId> {
        let mut ids: Vec<PieceId> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    /// 所有实体的根节点（包括正在退场的）
    pub fn roots(&self) -> Vec<(PieceId, Transform)> {
        let mut roots: Vec<(PieceId, Transform)> =
            self.entities.values().map(|e| (e.id, e.root)).collect();
        roots.sort_by_key(|(id, _)| *id);
        roots
    }

    /// 被登记占据格子的实体数
    pub fn occupied_squares(&self) -> usize {
        self.squares.len()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
