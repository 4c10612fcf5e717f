//! 走棋与攻击编排
//!
//! 每步走棋的状态：待机 →（预移动）→ 攻击 / 移动 → 收尾 → 待机。
//!
//! - 普通走棋：转向目标格，播放行走循环，匀速移动，到达后恢复朝向并切回待机。
//! - 吃子：远程棋子（车、象、后）沿直线隔着多格攻击时，先走到被吃棋子相邻的格子，
//!   再执行攻击序列。序列里每个步骤按偏移时间安排在定时队列上，
//!   全部相对序列开始计时。
//! - 被吃棋子立即进入退场状态并转向攻击方，格子登记在走棋时立即让给攻击方，
//!   在 `max(被吃方结束时间, 最短保留时间)` 之后移除。
//!
//! 定时事件带有实体的代数，到达记录带有位移令牌；
//! 过期的事件和记录直接丢弃。

use std::collections::HashMap;
use std::time::Duration;

use bevy::math::Vec3;
use bevy::prelude::Message;
use protocol::{PieceType, Position};
use tracing::{debug, info, warn};

use crate::attributes::AttributeResolver;
use crate::clips::{self, ClipKind};
use crate::config::ChoreographyConfig;
use crate::entity::{Arrival, PieceEntity, PieceId, PieceState};
use crate::error::{ChoreographyError, Result};
use crate::layout::{facing, BoardLayout};
use crate::motion;
use crate::sequence::{AttackSequence, SequenceResolver, SequenceStep, SequenceTarget};
use crate::store::PieceStore;
use crate::timer::TimerQueue;

/// 一次吃子的攻击计划
#[derive(Debug, Clone, PartialEq)]
pub struct AttackPlan {
    pub victim: PieceId,
    pub victim_type: PieceType,
    pub destination: Position,
    pub sequence: AttackSequence,
}

/// 编排过程中发出的事件，供场景层同步
#[derive(Debug, Clone, PartialEq, Message)]
pub enum ChoreographyEvent {
    MoveStarted {
        piece: PieceId,
        from: Position,
        to: Position,
        capture: Option<PieceId>,
    },
    PreMoveStarted {
        piece: PieceId,
        to: Position,
    },
    SequenceStarted {
        piece: PieceId,
        victim: PieceId,
        steps: usize,
        end_ms: f64,
        victim_end_ms: f64,
    },
    ClipStarted {
        piece: PieceId,
        clip: String,
        duration_ms: f64,
    },
    ClipMissing {
        piece: PieceId,
        clip: String,
    },
    Settled {
        piece: PieceId,
        position: Position,
    },
    PieceRemoved {
        piece: PieceId,
    },
}

/// 定时队列里的事件
#[derive(Debug, Clone)]
enum Staged {
    PlayClip {
        piece: PieceId,
        generation: u64,
        clip: ClipKind,
        attacker: Option<PieceType>,
    },
    StepMotion {
        piece: PieceId,
        generation: u64,
        step: SequenceStep,
        destination: Position,
    },
    BeginPreMove {
        piece: PieceId,
        generation: u64,
        adjacent: Position,
        plan: AttackPlan,
    },
    FinishSequence {
        piece: PieceId,
        generation: u64,
        destination: Position,
    },
    /// 被吃方的死亡动画已结束
    MarkDead {
        piece: PieceId,
    },
    RemoveVictim {
        piece: PieceId,
    },
}

/// 一帧内连续处理零延迟事件的上限
const MAX_DRAIN_ROUNDS: usize = 64;

/// 远程棋子隔格吃子时预移动到的格子（被吃棋子的相邻格）
pub fn pre_move_square(piece_type: PieceType, from: Position, to: Position) -> Option<Position> {
    if !piece_type.is_sliding() || from.chebyshev_distance(to) <= 1 {
        return None;
    }
    let (df, dr) = from.line_direction(to)?;
    to.offset(-df, -dr)
}

/// 编排器
#[derive(Debug)]
pub struct Choreographer {
    attributes: AttributeResolver,
    sequences: SequenceResolver,
    layout: BoardLayout,
    config: ChoreographyConfig,
    timers: TimerQueue<Staged>,
    events: Vec<ChoreographyEvent>,
    /// 等待攻击序列开始的被吃方 → (攻击方, 攻击方代数)
    awaiting_sequence: HashMap<PieceId, (PieceId, u64)>,
}

impl Choreographer {
    pub fn new(config: ChoreographyConfig, attributes: AttributeResolver, sequences: SequenceResolver) -> Self {
        let config = config.sanitized();
        Self {
            layout: BoardLayout::new(config.square_size),
            attributes,
            sequences,
            config,
            timers: TimerQueue::new(),
            events: Vec::new(),
            awaiting_sequence: HashMap::new(),
        }
    }

    pub fn attributes(&self) -> &AttributeResolver {
        &self.attributes
    }

    pub fn sequences(&self) -> &SequenceResolver {
        &self.sequences
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn config(&self) -> &ChoreographyConfig {
        &self.config
    }

    /// 虚拟时钟（毫秒）
    pub fn now_ms(&self) -> f64 {
        self.timers.now_ms()
    }

    /// 尚未触发的定时事件数
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// 取出累积的事件
    pub fn drain_events(&mut self) -> Vec<ChoreographyEvent> {
        std::mem::take(&mut self.events)
    }

    /// 丢弃所有定时事件和未取出的事件
    pub fn reset(&mut self) {
        self.timers.clear();
        self.events.clear();
        self.awaiting_sequence.clear();
    }

    /// 执行一步已被规则接受的走棋
    ///
    /// `captured` 为空而目标格上有其它棋子时，按吃掉该棋子处理。
    pub fn execute_move(
        &mut self,
        store: &mut PieceStore,
        id: PieceId,
        destination: Position,
        captured: Option<PieceId>,
    ) -> Result<()> {
        let entity = store.get(id).ok_or(ChoreographyError::UnknownPiece(id))?;
        if !entity.is_alive() {
            return Err(ChoreographyError::PieceNotOnBoard(id));
        }
        if !destination.is_valid() {
            return Err(ChoreographyError::InvalidDestination {
                file: destination.file as i8,
                rank: destination.rank as i8,
            });
        }
        let from = entity.position;
        let attacker_type = entity.piece_type;
        let side = entity.side;

        let victim = match captured.or_else(|| store.id_at(destination).filter(|other| *other != id)) {
            Some(victim) if victim == id => {
                return Err(ChoreographyError::InvalidDestination {
                    file: destination.file as i8,
                    rank: destination.rank as i8,
                })
            }
            Some(victim) => {
                let entity = store.get(victim).ok_or(ChoreographyError::UnknownPiece(victim))?;
                if !entity.is_alive() {
                    return Err(ChoreographyError::PieceNotOnBoard(victim));
                }
                Some((victim, entity.piece_type, entity.position))
            }
            None => None,
        };

        // 目标格上的其它棋子只能是被吃方
        if let Some(occupant) = store.id_at(destination) {
            let is_victim = victim.is_some_and(|(v, _, _)| v == occupant);
            if occupant != id && !is_victim {
                return Err(ChoreographyError::SquareOccupied(destination.square_name()));
            }
        }

        if from == destination && victim.is_none() {
            return Err(ChoreographyError::InvalidDestination {
                file: destination.file as i8,
                rank: destination.rank as i8,
            });
        }

        // 格子登记立即更新
        if let Some((victim_id, _, victim_square)) = victim {
            if store.id_at(victim_square) == Some(victim_id) {
                store.vacate(victim_square);
            }
        }
        store.relocate(id, destination)?;

        if let Some(entity) = store.get_mut(id) {
            entity.next_generation();
        }

        info!("{} {} -> {}", id, from, destination);
        self.events.push(ChoreographyEvent::MoveStarted {
            piece: id,
            from,
            to: destination,
            capture: victim.map(|(v, _, _)| v),
        });

        match victim {
            None => self.start_relocation(store, id, destination),
            Some((victim_id, victim_type, _)) => {
                self.mark_victim(store, victim_id, id);

                let sequence = self.sequences.resolve(attacker_type, victim_type, side);
                let plan = AttackPlan {
                    victim: victim_id,
                    victim_type,
                    destination,
                    sequence,
                };

                if plan.sequence.is_empty() {
                    debug!("{} 吃 {} 没有攻击序列，直接移动", id, victim_id);
                    self.start_relocation(store, id, destination);
                    self.timers.schedule_in(
                        self.config.grace_ms as f64,
                        Staged::RemoveVictim { piece: victim_id },
                    );
                } else {
                    match pre_move_square(attacker_type, from, destination) {
                        Some(adjacent) => {
                            let generation = store.get(id).map(|e| e.generation).unwrap_or_default();
                            self.awaiting_sequence.insert(victim_id, (id, generation));
                            self.prepare_pre_move(store, id, adjacent, plan)
                        }
                        None => self.begin_sequence(store, id, plan),
                    }
                }
            }
        }

        self.release_orphaned_victims(store);
        self.process_due(store);
        Ok(())
    }

    /// 推进一帧
    pub fn advance(&mut self, store: &mut PieceStore, delta_secs: f32) {
        let dt = if delta_secs.is_finite() { delta_secs.max(0.0) } else { 0.0 };

        // 先推进时钟，到达时开始的序列按本帧结束时刻计时
        let due = self.timers.advance(dt as f64 * 1000.0);

        for (id, arrival) in motion::advance_all(store, dt) {
            self.handle_arrival(store, id, arrival);
        }
        for staged in due {
            self.handle_staged(store, staged);
        }

        self.release_orphaned_victims(store);
        self.process_due(store);
    }

    /// 攻击方在序列开始前被新的走棋取代或自己被吃时，被吃方按最短保留时间移除
    fn release_orphaned_victims(&mut self, store: &PieceStore) {
        let orphaned: Vec<PieceId> = self
            .awaiting_sequence
            .iter()
            .filter(|(_, (attacker, generation))| {
                store
                    .get(*attacker)
                    .map_or(true, |entity| entity.generation != *generation)
            })
            .map(|(victim, _)| *victim)
            .collect();

        for victim in orphaned {
            self.awaiting_sequence.remove(&victim);
            debug!("{} 的攻击序列已取消，{} ms 后移除", victim, self.config.grace_ms);
            self.timers.schedule_in(
                self.config.grace_ms as f64,
                Staged::RemoveVictim { piece: victim },
            );
        }
    }

    /// 处理当前时刻已到期的事件（包括处理过程中新安排的零延迟事件）
    fn process_due(&mut self, store: &mut PieceStore) {
        for _ in 0..MAX_DRAIN_ROUNDS {
            let due = self.timers.drain_due();
            if due.is_empty() {
                return;
            }
            for staged in due {
                self.handle_staged(store, staged);
            }
        }
        warn!("零延迟事件过多，剩余事件留到下一帧");
    }

    fn move_speed(&self, entity: &PieceEntity) -> f32 {
        self.layout
            .world_speed(self.attributes.resolve_move_speed(entity.piece_type, entity.side))
    }

    fn play(&mut self, entity: &mut PieceEntity, kind: &ClipKind, attacker: Option<PieceType>) -> Option<Duration> {
        let played = clips::play_clip(entity, kind, attacker, &self.attributes, self.config.cross_fade_secs);
        match played {
            Some(duration) => self.events.push(ChoreographyEvent::ClipStarted {
                piece: entity.id,
                clip: entity.active_clip_name().unwrap_or_default().to_string(),
                duration_ms: duration.as_secs_f64() * 1000.0,
            }),
            None => self.events.push(ChoreographyEvent::ClipMissing {
                piece: entity.id,
                clip: kind.name(),
            }),
        }
        played
    }

    /// 转向某个世界坐标
    fn face(&self, entity: &mut PieceEntity, target: Vec3) {
        if let Some(rotation) = facing(entity.root.translation, target) {
            entity.set_rotation(rotation, self.config.rotation_speed);
        }
    }

    /// 普通移动：转向、行走、到达后收尾
    fn start_relocation(&mut self, store: &mut PieceStore, id: PieceId, destination: Position) {
        let target = self.layout.board_to_world(destination);
        let Some(entity) = store.get_mut(id) else {
            return;
        };

        entity.state = PieceState::Moving;
        self.face(entity, target);
        self.play(entity, &ClipKind::Walk, None);
        let speed = self.move_speed(entity);
        entity.set_motion(target, speed, |token| Some(Arrival::Settle { token }));
    }

    /// 被吃棋子：进入退场状态，转向攻击方
    fn mark_victim(&mut self, store: &mut PieceStore, victim: PieceId, attacker: PieceId) {
        let Some(attacker_at) = store.get(attacker).map(|e| e.root.translation) else {
            return;
        };
        let Some(entity) = store.get_mut(victim) else {
            return;
        };
        entity.state = PieceState::Dying;
        entity.next_generation();
        entity.clear_motion();
        self.face(entity, attacker_at);
    }

    /// 远程吃子：需要时先播放一次热身动画，再预移动
    fn prepare_pre_move(&mut self, store: &mut PieceStore, id: PieceId, adjacent: Position, plan: AttackPlan) {
        let Some(entity) = store.get_mut(id) else {
            return;
        };
        entity.state = PieceState::Moving;

        if !entity.first_move_played && clips::resolve_action(entity, &ClipKind::FirstMove, None).is_some() {
            entity.first_move_played = true;
            let generation = entity.generation;
            let target = self.layout.board_to_world(adjacent);
            self.face(entity, target);
            let duration = self
                .play(entity, &ClipKind::FirstMove, None)
                .unwrap_or_default();
            self.timers.schedule_in(
                duration.as_secs_f64() * 1000.0,
                Staged::BeginPreMove {
                    piece: id,
                    generation,
                    adjacent,
                    plan,
                },
            );
            return;
        }

        self.begin_pre_move(store, id, adjacent, plan);
    }

    fn begin_pre_move(&mut self, store: &mut PieceStore, id: PieceId, adjacent: Position, plan: AttackPlan) {
        let Some(entity) = store.get_mut(id) else {
            return;
        };

        let target = self.layout.board_to_world(adjacent);
        entity.state = PieceState::Moving;
        self.face(entity, target);
        self.play(entity, &ClipKind::Walk, None);
        let speed = self.move_speed(entity);
        entity.set_motion(target, speed, |token| {
            Some(Arrival::BeginSequence {
                token,
                plan: Box::new(plan),
            })
        });

        info!("{} 预移动到 {}", id, adjacent);
        self.events.push(ChoreographyEvent::PreMoveStarted { piece: id, to: adjacent });
    }

    /// 步骤片段折算时间缩放后的时长（毫秒），找不到片段为 0
    fn step_duration_ms(
        &self,
        store: &PieceStore,
        attacker: PieceId,
        victim: PieceId,
        attacker_type: PieceType,
        step: &SequenceStep,
    ) -> f64 {
        let (target, qualifier) = match step.target {
            SequenceTarget::Attacker => (attacker, None),
            SequenceTarget::Victim => (victim, Some(attacker_type)),
        };
        let Some(entity) = store.get(target) else {
            return 0.0;
        };
        let time_scale = self
            .attributes
            .resolve_animation_time_scale(entity.piece_type, entity.side);
        clips::resolve_action(entity, &ClipKind::parse(&step.clip), qualifier)
            .and_then(|action| entity.mixer.action(action))
            .map(|action| action.clip().duration as f64 / time_scale as f64 * 1000.0)
            .unwrap_or(0.0)
    }

    /// 开始攻击序列，所有步骤相对现在计时
    fn begin_sequence(&mut self, store: &mut PieceStore, id: PieceId, plan: AttackPlan) {
        let Some(attacker_type) = store.get(id).map(|e| e.piece_type) else {
            return;
        };
        let victim = plan.victim;
        self.awaiting_sequence.remove(&victim);
        let view: &PieceStore = store;
        let duration = |step: &SequenceStep| self.step_duration_ms(view, id, victim, attacker_type, step);
        let end_ms = plan.sequence.end_ms(&duration);
        let victim_end_ms = plan.sequence.victim_end_ms(&duration);

        let victim_at = store.get(victim).map(|e| e.root.translation);
        let victim_generation = store.get(victim).map(|e| e.generation).unwrap_or_default();
        let Some(entity) = store.get_mut(id) else {
            return;
        };
        entity.state = PieceState::Attacking;
        let generation = entity.generation;
        if let Some(victim_at) = victim_at {
            self.face(entity, victim_at);
        }

        // 被吃方的防御姿势
        if let Some(victim_entity) = store.get_mut(victim) {
            if clips::resolve_action(victim_entity, &ClipKind::Ready, None).is_some() {
                self.play(victim_entity, &ClipKind::Ready, None);
            }
        }

        for step in plan.sequence.iter() {
            let staged = if step.is_attacker_move() {
                Staged::StepMotion {
                    piece: id,
                    generation,
                    step: step.clone(),
                    destination: plan.destination,
                }
            } else {
                match step.target {
                    SequenceTarget::Attacker => Staged::PlayClip {
                        piece: id,
                        generation,
                        clip: ClipKind::parse(&step.clip),
                        attacker: None,
                    },
                    SequenceTarget::Victim => Staged::PlayClip {
                        piece: victim,
                        generation: victim_generation,
                        clip: ClipKind::parse(&step.clip),
                        attacker: Some(attacker_type),
                    },
                }
            };
            self.timers.schedule_in(step.offset_ms(), staged);
        }

        self.timers.schedule_in(
            end_ms,
            Staged::FinishSequence {
                piece: id,
                generation,
                destination: plan.destination,
            },
        );
        let remove_after = victim_end_ms.max(self.config.grace_ms as f64);
        if victim_end_ms < remove_after {
            self.timers
                .schedule_in(victim_end_ms, Staged::MarkDead { piece: victim });
        }
        self.timers
            .schedule_in(remove_after, Staged::RemoveVictim { piece: victim });

        info!(
            "{} 开始攻击序列：{} 步，结束 {:.0} ms，被吃方 {} 在 {:.0} ms 后移除",
            id,
            plan.sequence.len(),
            end_ms,
            victim,
            remove_after
        );
        self.events.push(ChoreographyEvent::SequenceStarted {
            piece: id,
            victim,
            steps: plan.sequence.len(),
            end_ms,
            victim_end_ms,
        });
    }

    /// 回到待机：恢复朝向，切回待机动画
    fn settle(&mut self, entity: &mut PieceEntity) {
        entity.state = PieceState::Idle;
        entity.rotation = None;
        entity.set_rotation(entity.base_rotation, self.config.rotation_speed);

        if clips::resolve_action(entity, &ClipKind::Idle, None).is_some() {
            self.play(entity, &ClipKind::Idle, None);
        } else {
            clips::stop_active(entity, self.config.cross_fade_secs);
        }

        self.events.push(ChoreographyEvent::Settled {
            piece: entity.id,
            position: entity.position,
        });
    }

    fn handle_arrival(&mut self, store: &mut PieceStore, id: PieceId, arrival: Arrival) {
        let Some(entity) = store.get_mut(id) else {
            return;
        };
        if arrival.token() != entity.motion_token {
            debug!("{} 丢弃过期的到达记录", id);
            return;
        }

        match arrival {
            Arrival::Settle { .. } => self.settle(entity),
            Arrival::BeginSequence { plan, .. } => self.begin_sequence(store, id, *plan),
            Arrival::StepDone { .. } => debug!("{} 序列移动步骤到达", id),
        }
    }

    /// 实体存在且仍处于安排事件时的那一步
    fn current<'a>(store: &'a mut PieceStore, id: PieceId, generation: u64) -> Option<&'a mut PieceEntity> {
        match store.get_mut(id) {
            Some(entity) if entity.generation == generation => Some(entity),
            Some(_) => {
                debug!("{} 丢弃过期的定时事件", id);
                None
            }
            None => None,
        }
    }

    fn handle_staged(&mut self, store: &mut PieceStore, staged: Staged) {
        match staged {
            Staged::PlayClip {
                piece,
                generation,
                clip,
                attacker,
            } => {
                if let Some(entity) = Self::current(store, piece, generation) {
                    self.play(entity, &clip, attacker);
                }
            }
            Staged::StepMotion {
                piece,
                generation,
                step,
                destination,
            } => {
                let Some(entity) = Self::current(store, piece, generation) else {
                    return;
                };
                let target = self.layout.board_to_world(destination);
                let clip_secs = self
                    .play(entity, &ClipKind::parse(&step.clip), None)
                    .map(|d| d.as_secs_f32())
                    .unwrap_or(0.0);

                let distance = entity.root.translation.distance(target);
                let speed = if step.stop_on_clip_end && clip_secs > 0.0 {
                    distance / clip_secs
                } else {
                    step.speed
                        .filter(|s| s.is_finite() && *s > 0.0)
                        .map(|s| self.layout.world_speed(s))
                        .unwrap_or_else(|| self.move_speed(entity))
                };
                self.face(entity, target);
                entity.set_motion(target, speed, |token| Some(Arrival::StepDone { token }));
            }
            Staged::BeginPreMove {
                piece,
                generation,
                adjacent,
                plan,
            } => {
                if Self::current(store, piece, generation).is_some() {
                    self.begin_pre_move(store, piece, adjacent, plan);
                }
            }
            Staged::FinishSequence {
                piece,
                generation,
                destination,
            } => {
                let Some(entity) = Self::current(store, piece, generation) else {
                    return;
                };
                let target = self.layout.board_to_world(destination);
                if entity.is_moving() {
                    // 正在进行的移动步骤本来就朝向目标格，到达后直接收尾
                    entity.on_arrive = Some(Arrival::Settle {
                        token: entity.motion_token,
                    });
                } else if entity.root.translation != target {
                    entity.state = PieceState::Moving;
                    self.face(entity, target);
                    self.play(entity, &ClipKind::Walk, None);
                    let speed = self.move_speed(entity);
                    entity.set_motion(target, speed, |token| Some(Arrival::Settle { token }));
                } else {
                    self.settle(entity);
                }
            }
            Staged::MarkDead { piece } => {
                if let Some(entity) = store.get_mut(piece) {
                    if entity.state == PieceState::Dying {
                        entity.state = PieceState::Dead;
                    }
                }
            }
            Staged::RemoveVictim { piece } => {
                if let Some(entity) = store.get_mut(piece) {
                    entity.state = PieceState::Dead;
                }
                if let Some(entity) = store.remove(piece) {
                    info!("{} ({} {}) 已移除", piece, entity.side, entity.piece_type);
                    self.events.push(ChoreographyEvent::PieceRemoved { piece });
                }
            }
        }
    }
}
