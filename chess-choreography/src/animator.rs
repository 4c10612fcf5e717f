//! 棋盘动画入口
//!
//! 输入处理方通过这里创建实体、查询格子上的棋子、提交走棋；
//! 渲染循环每帧调用一次 [`BoardAnimator::advance`]。

use bevy::prelude::Resource;
use bevy::transform::components::Transform;
use protocol::{Board, ChessError, MoveOutcome, Position, RulesEngine};
use tracing::{info, warn};

use crate::assets::TemplateLibrary;
use crate::attributes::{AttributeConfig, AttributeResolver};
use crate::choreographer::{ChoreographyEvent, Choreographer};
use crate::config::{ChoreographyConfig, LoadedConfig};
use crate::entity::{PieceEntity, PieceId};
use crate::error::{ChoreographyError, Result};
use crate::sequence::{SequenceConfig, SequenceResolver};
use crate::store::{PieceStore, SpawnContext};

/// 棋盘动画
#[derive(Debug, Resource)]
pub struct BoardAnimator {
    store: PieceStore,
    choreographer: Choreographer,
    templates: TemplateLibrary,
}

impl Default for BoardAnimator {
    fn default() -> Self {
        Self::new(
            ChoreographyConfig::default(),
            AttributeConfig::default(),
            SequenceConfig::default(),
            TemplateLibrary::default(),
        )
    }
}

impl BoardAnimator {
    pub fn new(
        config: ChoreographyConfig,
        attributes: AttributeConfig,
        sequences: SequenceConfig,
        templates: TemplateLibrary,
    ) -> Self {
        Self {
            store: PieceStore::new(),
            choreographer: Choreographer::new(
                config,
                AttributeResolver::new(attributes),
                SequenceResolver::new(sequences),
            ),
            templates,
        }
    }

    /// 使用加载好的配置
    pub fn from_loaded(loaded: LoadedConfig, templates: TemplateLibrary) -> Self {
        Self::new(loaded.choreography, loaded.attributes, loaded.sequences, templates)
    }

    /// 按棋盘重新创建所有实体，之前的实体和未触发的事件全部丢弃
    pub fn create_entities(&mut self, board: &Board) -> Result<usize> {
        self.store.clear();
        self.choreographer.reset();

        let ctx = SpawnContext {
            templates: &self.templates,
            attributes: self.choreographer.attributes(),
            layout: self.choreographer.layout(),
        };
        for (position, piece) in board.all_pieces() {
            self.store.create(piece.side, piece.piece_type, position, ctx)?;
        }

        info!("已创建 {} 个棋子实体", self.store.len());
        Ok(self.store.len())
    }

    /// 格子名称上的棋子
    pub fn entity_at(&self, square: &str) -> Option<&PieceEntity> {
        Position::from_square(square).and_then(|pos| self.store.by_square(pos))
    }

    pub fn entity_at_position(&self, position: Position) -> Option<&PieceEntity> {
        self.store.by_square(position)
    }

    pub fn entity(&self, id: PieceId) -> Option<&PieceEntity> {
        self.store.get(id)
    }

    /// 所有实体的根节点，包括正在退场的棋子
    pub fn all_entity_roots(&self) -> Vec<(PieceId, Transform)> {
        self.store.roots()
    }

    /// 提交已被规则接受的走棋
    pub fn execute_move(&mut self, id: PieceId, file: u8, rank: u8, captured: Option<PieceId>) -> Result<()> {
        let destination = Position::new(file, rank).ok_or(ChoreographyError::InvalidDestination {
            file: file as i8,
            rank: rank as i8,
        })?;
        self.choreographer
            .execute_move(&mut self.store, id, destination, captured)
    }

    /// 先交给规则引擎，被接受后再编排动画
    ///
    /// 被拒绝的走法原样返回结果，不产生任何视觉变化。
    pub fn apply_rules_move(
        &mut self,
        rules: &mut dyn RulesEngine,
        from: Position,
        to: Position,
    ) -> Result<MoveOutcome> {
        let id = self
            .store
            .id_at(from)
            .ok_or_else(|| ChessError::NoPiece(from.square_name()))?;
        let captured = self.store.id_at(to);

        let outcome = rules.apply_move(from, to);
        if !outcome.accepted {
            return Ok(outcome);
        }

        if outcome.captured_type.is_some() != captured.is_some() {
            warn!(
                "规则引擎报告的吃子与实体不一致: {} -> {}, 规则 {:?}, 实体 {:?}",
                from, to, outcome.captured_type, captured
            );
        }

        self.choreographer
            .execute_move(&mut self.store, id, to, captured)?;
        Ok(outcome)
    }

    /// 推进一帧，负数和非有限值按 0 处理
    pub fn advance(&mut self, delta_secs: f32) {
        self.choreographer.advance(&mut self.store, delta_secs);
    }

    pub fn drain_events(&mut self) -> Vec<ChoreographyEvent> {
        self.choreographer.drain_events()
    }

    /// 虚拟时钟（毫秒）
    pub fn now_ms(&self) -> f64 {
        self.choreographer.now_ms()
    }

    /// 没有进行中的位移、旋转和定时事件
    pub fn is_settled(&self) -> bool {
        self.choreographer.pending_timers() == 0
            && self
                .store
                .iter()
                .all(|e| e.motion.is_none() && e.rotation.is_none())
    }

    pub fn store(&self) -> &PieceStore {
        &self.store
    }

    pub fn choreographer(&self) -> &Choreographer {
        &self.choreographer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{PieceType, StandardRules};

    use crate::entity::PieceState;

    #[test]
    fn test_create_entities_from_board() {
        let mut animator = BoardAnimator::default();
        assert_eq!(animator.create_entities(&Board::initial()).unwrap(), 32);

        let king = animator.entity_at("e1").unwrap();
        assert_eq!(king.piece_type, PieceType::King);
        assert!(animator.entity_at("e4").is_none());
        assert!(animator.entity_at("z9").is_none());

        // 重新创建时替换全部实体
        animator.create_entities(&Board::initial()).unwrap();
        assert_eq!(animator.all_entity_roots().len(), 32);
    }

    #[test]
    fn test_execute_move_rejects_bad_input() {
        let mut animator = BoardAnimator::default();
        animator.create_entities(&Board::initial()).unwrap();
        let pawn = animator.entity_at("e2").unwrap().id;

        assert!(matches!(
            animator.execute_move(pawn, 8, 3, None),
            Err(ChoreographyError::InvalidDestination { .. })
        ));
        assert!(matches!(
            animator.execute_move(PieceId(999), 4, 3, None),
            Err(ChoreographyError::UnknownPiece(_))
        ));
        assert!(matches!(
            animator.execute_move(pawn, 4, 1, None),
            Err(ChoreographyError::InvalidDestination { .. })
        ));
        // 没有任何视觉变化
        assert_eq!(animator.entity_at("e2").unwrap().state, PieceState::Idle);
        assert!(animator.drain_events().is_empty());
    }

    #[test]
    fn test_rejected_rules_move_is_noop() {
        let mut rules = StandardRules::new();
        let mut animator = BoardAnimator::default();
        animator.create_entities(&rules.current_board_state()).unwrap();

        let e2 = Position::from_square("e2").unwrap();
        let e5 = Position::from_square("e5").unwrap();
        let outcome = animator.apply_rules_move(&mut rules, e2, e5).unwrap();

        assert!(!outcome.accepted);
        assert!(animator.entity_at("e2").is_some());
        assert!(animator.drain_events().is_empty());
        assert!(animator.is_settled());

        // 空格子
        let e4 = Position::from_square("e4").unwrap();
        assert!(matches!(
            animator.apply_rules_move(&mut rules, e4, e5),
            Err(ChoreographyError::Chess(ChessError::NoPiece(_)))
        ));
    }

    #[test]
    fn test_advance_clamps_bad_delta() {
        let mut animator = BoardAnimator::default();
        animator.advance(-1.0);
        animator.advance(f32::NAN);
        assert_eq!(animator.now_ms(), 0.0);
    }
}
