//! 走棋编排场景测试
//!
//! 全部使用虚拟时钟，以固定帧长推进。

use chess_choreography::layout::base_facing;
use chess_choreography::sequence::{SequenceStep, SequenceTarget};
use chess_choreography::{
    AttackSequence, AttributeConfig, BoardAnimator, ChoreographyConfig, ChoreographyEvent, PieceId,
    PieceState, PieceTemplate, SequenceConfig, TemplateLibrary,
};
use protocol::{Board, Piece, PieceType, Position, RulesEngine, Side, StandardRules};

const FRAME: f32 = 1.0 / 60.0;
const FRAME_MS: f64 = 1000.0 / 60.0;

fn sq(name: &str) -> Position {
    Position::from_square(name).unwrap()
}

fn board_with(pieces: &[(&str, PieceType, Side)]) -> Board {
    let mut board = Board::empty();
    for (square, piece_type, side) in pieces {
        board.set(sq(square), Some(Piece::new(*piece_type, *side)));
    }
    board
}

fn attack_templates() -> TemplateLibrary {
    TemplateLibrary::new()
        .with(
            Side::White,
            PieceType::Queen,
            PieceTemplate::new("queen_white.glb")
                .with_clip("idle", 2.0)
                .with_clip("walk", 1.0)
                .with_clip("attack", 0.8),
        )
        .with(
            Side::Black,
            PieceType::Pawn,
            PieceTemplate::new("pawn_black.glb")
                .with_clip("idle", 2.0)
                .with_clip("ready", 1.0)
                .with_clip("hit", 0.5)
                .with_clip("die", 1.5),
        )
}

fn default_sequence() -> SequenceConfig {
    SequenceConfig {
        default: AttackSequence::new(vec![
            SequenceStep::new(SequenceTarget::Attacker, "attack", 0.0),
            SequenceStep::new(SequenceTarget::Victim, "hit", 300.0),
            SequenceStep::new(SequenceTarget::Victim, "die", 700.0),
        ]),
        ..Default::default()
    }
}

/// 逐帧推进直到条件满足，返回期间的所有事件
fn run_until(
    animator: &mut BoardAnimator,
    max_frames: usize,
    mut done: impl FnMut(&BoardAnimator, &[ChoreographyEvent]) -> bool,
) -> Vec<ChoreographyEvent> {
    let mut events = animator.drain_events();
    for _ in 0..max_frames {
        if done(animator, &events) {
            return events;
        }
        animator.advance(FRAME);
        events.extend(animator.drain_events());
    }
    assert!(done(animator, &events), "条件在 {} 帧内未满足", max_frames);
    events
}

fn has_removed(events: &[ChoreographyEvent], piece: PieceId) -> bool {
    events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::PieceRemoved { piece: p } if *p == piece))
}

#[test]
fn test_plain_move_settles() {
    let mut animator = BoardAnimator::default();
    animator.create_entities(&Board::initial()).unwrap();
    let pawn = animator.entity_at("e2").unwrap().id;

    animator.execute_move(pawn, 4, 3, None).unwrap();
    // 格子登记立即更新
    assert_eq!(animator.entity_at("e4").unwrap().id, pawn);
    assert!(animator.entity_at("e2").is_none());
    assert_eq!(animator.entity(pawn).unwrap().state, PieceState::Moving);

    let events = run_until(&mut animator, 600, |a, _| a.is_settled());

    let entity = animator.entity(pawn).unwrap();
    assert_eq!(entity.state, PieceState::Idle);
    assert_eq!(entity.position, sq("e4"));
    assert_eq!(
        entity.root.translation,
        animator.choreographer().layout().board_to_world(sq("e4"))
    );
    assert_eq!(entity.root.rotation, base_facing(Side::White));
    assert!(events.iter().any(|e| matches!(
        e,
        ChoreographyEvent::Settled { piece, position } if *piece == pawn && *position == sq("e4")
    )));
}

#[test]
fn test_sliding_capture_pre_moves_then_attacks() {
    let board = board_with(&[("d1", PieceType::Queen, Side::White), ("d7", PieceType::Pawn, Side::Black)]);
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        default_sequence(),
        attack_templates(),
    );
    animator.create_entities(&board).unwrap();
    let queen = animator.entity_at("d1").unwrap().id;
    let pawn = animator.entity_at("d7").unwrap().id;

    animator.execute_move(queen, 3, 6, None).unwrap();
    let issued = animator.drain_events();

    // 走棋时被吃方自动识别，立即让出格子但仍在场景中
    assert!(issued.iter().any(|e| matches!(
        e,
        ChoreographyEvent::MoveStarted { piece, capture: Some(victim), .. } if *piece == queen && *victim == pawn
    )));
    assert!(issued
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::PreMoveStarted { to, .. } if *to == sq("d6"))));
    assert!(!issued
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::SequenceStarted { .. })));
    assert_eq!(animator.entity_at("d7").unwrap().id, queen);
    assert_eq!(animator.entity(pawn).unwrap().state, PieceState::Dying);
    assert!(animator.all_entity_roots().iter().any(|(id, _)| *id == pawn));

    // 到达相邻格后开始攻击序列
    let events = run_until(&mut animator, 600, |_, events| {
        events
            .iter()
            .any(|e| matches!(e, ChoreographyEvent::SequenceStarted { .. }))
    });
    let started_at = animator.now_ms();
    let queen_entity = animator.entity(queen).unwrap();
    assert_eq!(queen_entity.state, PieceState::Attacking);
    assert_eq!(
        queen_entity.root.translation,
        animator.choreographer().layout().board_to_world(sq("d6"))
    );
    let (end_ms, victim_end_ms) = events
        .iter()
        .find_map(|e| match e {
            ChoreographyEvent::SequenceStarted {
                end_ms, victim_end_ms, ..
            } => Some((*end_ms, *victim_end_ms)),
            _ => None,
        })
        .unwrap();
    // attack 0+800, hit 300+500, die 700+1500
    assert_eq!(end_ms, 2200.0);
    assert_eq!(victim_end_ms, 2200.0);
    assert!(events.iter().any(|e| matches!(
        e,
        ChoreographyEvent::ClipStarted { piece, clip, .. } if *piece == pawn && clip == "ready"
    )));

    // 移除前一直保留
    let events = run_until(&mut animator, 600, |_, events| has_removed(events, pawn));
    let removed_at = animator.now_ms();
    assert!(removed_at - started_at >= 2200.0 - 1e-6);
    assert!(removed_at - started_at <= 2200.0 + FRAME_MS + 1e-3);
    assert!(events.iter().any(|e| matches!(
        e,
        ChoreographyEvent::ClipStarted { piece, clip, .. } if *piece == pawn && clip == "die"
    )));
    assert!(animator.entity(pawn).is_none());
    assert!(!animator.all_entity_roots().iter().any(|(id, _)| *id == pawn));

    // 序列结束后走进目标格并恢复待机
    run_until(&mut animator, 600, |a, _| a.is_settled());
    let queen_entity = animator.entity(queen).unwrap();
    assert_eq!(queen_entity.state, PieceState::Idle);
    assert_eq!(
        queen_entity.root.translation,
        animator.choreographer().layout().board_to_world(sq("d7"))
    );
    assert_eq!(queen_entity.active_clip_name(), Some("idle"));
}

#[test]
fn test_empty_sequence_still_captures() {
    let board = board_with(&[("g1", PieceType::Knight, Side::White), ("f3", PieceType::Pawn, Side::Black)]);
    let mut animator = BoardAnimator::default();
    animator.create_entities(&board).unwrap();
    let knight = animator.entity_at("g1").unwrap().id;
    let pawn = animator.entity_at("f3").unwrap().id;

    animator.execute_move(knight, 5, 2, Some(pawn)).unwrap();
    assert_eq!(animator.entity_at("f3").unwrap().id, knight);

    let events = run_until(&mut animator, 600, |_, events| has_removed(events, pawn));
    assert!(animator.now_ms() >= 1200.0 - 1e-3);
    assert!(events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::Settled { piece, .. } if *piece == knight)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::SequenceStarted { .. })));
    assert_eq!(animator.store().len(), 1);
}

#[test]
fn test_motion_never_overshoots() {
    let board = board_with(&[("a1", PieceType::Rook, Side::White)]);
    let mut animator = BoardAnimator::default();
    animator.create_entities(&board).unwrap();
    let rook = animator.entity_at("a1").unwrap().id;

    let layout = *animator.choreographer().layout();
    let start = layout.board_to_world(sq("a1"));
    let target = layout.board_to_world(sq("a8"));
    let total = start.distance(target);
    let direction = (target - start).normalize();

    animator.execute_move(rook, 0, 7, None).unwrap();
    let mut previous = 0.0;
    for _ in 0..600 {
        animator.advance(FRAME);
        let at = animator.entity(rook).unwrap().root.translation;
        let travelled = (at - start).dot(direction);
        assert!(travelled <= total + 1e-4);
        assert!(travelled + 1e-5 >= previous);
        previous = travelled;
        if animator.is_settled() {
            break;
        }
    }
    assert_eq!(animator.entity(rook).unwrap().root.translation, target);
}

#[test]
fn test_attribute_defaults_and_overrides() {
    let attributes = AttributeConfig::from_json(
        r##"{
            "defaults": { "scale": 0.9, "color": { "white": "#eeeeee" } },
            "overrides": { "queen": { "scale": { "black": 1.2 } } }
        }"##,
    )
    .unwrap();
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        attributes,
        SequenceConfig::default(),
        TemplateLibrary::default(),
    );
    animator.create_entities(&Board::initial()).unwrap();

    let white_queen = animator.entity_at("d1").unwrap();
    assert_eq!(white_queen.visual.scale, 0.9);
    assert_eq!(white_queen.visual.color, Some(0xEEEEEE));

    let black_queen = animator.entity_at("d8").unwrap();
    assert_eq!(black_queen.visual.scale, 1.2);
    assert_eq!(black_queen.visual.color, None);

    // 没有配置时使用内置默认值
    let mut plain = BoardAnimator::default();
    plain.create_entities(&Board::initial()).unwrap();
    assert_eq!(plain.entity_at("d1").unwrap().visual.scale, 0.8);
}

#[test]
fn test_square_index_matches_rules_board() {
    let mut rules = StandardRules::new();
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        default_sequence(),
        TemplateLibrary::default(),
    );
    animator.create_entities(&rules.current_board_state()).unwrap();

    for (from, to) in [("e2", "e4"), ("d7", "d5"), ("e4", "d5"), ("d8", "d5"), ("b1", "c3"), ("d5", "a5")] {
        let outcome = animator.apply_rules_move(&mut rules, sq(from), sq(to)).unwrap();
        assert!(outcome.accepted, "{} -> {} 被拒绝", from, to);
        run_until(&mut animator, 1200, |a, _| a.is_settled());

        let board = rules.current_board_state();
        let pieces = board.all_pieces();
        assert_eq!(animator.store().occupied_squares(), pieces.len());
        assert_eq!(animator.store().len(), pieces.len());
        for (position, piece) in pieces {
            let entity = animator.entity_at_position(position).unwrap();
            assert_eq!(entity.piece_type, piece.piece_type);
            assert_eq!(entity.side, piece.side);
            assert_eq!(entity.position, position);
        }
    }
}

fn warm_up_templates() -> TemplateLibrary {
    attack_templates().with(
        Side::White,
        PieceType::Queen,
        PieceTemplate::new("queen_white.glb")
            .with_clip("idle", 2.0)
            .with_clip("walk", 1.0)
            .with_clip("attack", 0.8)
            .with_clip("first-move", 0.5),
    )
}

fn clip_started(events: &[ChoreographyEvent], piece: PieceId, name: &str) -> bool {
    events.iter().any(|e| matches!(
        e,
        ChoreographyEvent::ClipStarted { piece: p, clip, .. } if *p == piece && clip == name
    ))
}

fn pre_move_started(events: &[ChoreographyEvent]) -> bool {
    events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::PreMoveStarted { .. }))
}

#[test]
fn test_first_move_warm_up_plays_once() {
    let board = board_with(&[
        ("d1", PieceType::Queen, Side::White),
        ("d7", PieceType::Pawn, Side::Black),
        ("a4", PieceType::Pawn, Side::Black),
    ]);
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        default_sequence(),
        warm_up_templates(),
    );
    animator.create_entities(&board).unwrap();
    let queen = animator.entity_at("d1").unwrap().id;
    let second = animator.entity_at("a4").unwrap().id;
    animator.drain_events();

    animator.execute_move(queen, 3, 6, None).unwrap();
    let issued = animator.drain_events();
    assert!(clip_started(&issued, queen, "first-move"));
    assert!(!pre_move_started(&issued));
    assert!(animator.entity(queen).unwrap().first_move_played);

    // 热身动画结束后才开始预移动
    let events = run_until(&mut animator, 600, |_, events| pre_move_started(events));
    assert!(animator.now_ms() >= 500.0 - 1e-6);
    assert!(animator.now_ms() <= 500.0 + FRAME_MS + 1e-3);
    assert!(!clip_started(&events, queen, "first-move"));
    run_until(&mut animator, 1200, |a, _| a.is_settled());

    // 第二次远程吃子直接预移动
    animator.execute_move(queen, 0, 3, Some(second)).unwrap();
    let issued = animator.drain_events();
    assert!(!clip_started(&issued, queen, "first-move"));
    assert!(issued
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::PreMoveStarted { to, .. } if *to == sq("b5"))));
    let events = run_until(&mut animator, 1200, |a, _| a.is_settled());
    assert!(!clip_started(&events, queen, "first-move"));
    assert_eq!(animator.entity(queen).unwrap().position, sq("a4"));
}

fn lunge_animator(step: SequenceStep, victim_at: f64) -> (BoardAnimator, PieceId, PieceId) {
    let templates = attack_templates().with(
        Side::White,
        PieceType::Queen,
        PieceTemplate::new("queen_white.glb")
            .with_clip("idle", 2.0)
            .with_clip("walk", 1.0)
            .with_clip("lunge", 1.0),
    );
    let sequences = SequenceConfig {
        default: AttackSequence::new(vec![step, SequenceStep::new(SequenceTarget::Victim, "die", victim_at)]),
        ..Default::default()
    };
    let board = board_with(&[("d6", PieceType::Queen, Side::White), ("d7", PieceType::Pawn, Side::Black)]);
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        sequences,
        templates,
    );
    animator.create_entities(&board).unwrap();
    let queen = animator.entity_at("d6").unwrap().id;
    let pawn = animator.entity_at("d7").unwrap().id;
    (animator, queen, pawn)
}

#[test]
fn test_move_step_stops_on_clip_end() {
    let (mut animator, queen, _) = lunge_animator(SequenceStep::attacker_move("lunge", 0.0, None, true), 0.0);
    let target = animator.choreographer().layout().board_to_world(sq("d7"));

    animator.execute_move(queen, 3, 6, None).unwrap();
    let issued = animator.drain_events();
    assert!(clip_started(&issued, queen, "lunge"));
    assert!(animator.entity(queen).unwrap().is_moving());

    // 速度按片段时长折算，片段结束时正好到达
    let events = run_until(&mut animator, 600, |a, _| !a.entity(queen).unwrap().is_moving());
    assert!(animator.now_ms() >= 1000.0 - 2.0 * FRAME_MS);
    assert!(animator.now_ms() <= 1000.0 + 2.0 * FRAME_MS);
    let entity = animator.entity(queen).unwrap();
    assert_eq!(entity.root.translation, target);
    // 到达不收尾，等序列结束
    assert_eq!(entity.state, PieceState::Attacking);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::Settled { .. })));

    // die 0+1500
    run_until(&mut animator, 600, |_, events| {
        events
            .iter()
            .any(|e| matches!(e, ChoreographyEvent::Settled { piece, .. } if *piece == queen))
    });
    assert!(animator.now_ms() >= 1500.0 - 1e-6);
    assert_eq!(animator.entity(queen).unwrap().state, PieceState::Idle);
}

#[test]
fn test_sequence_end_hands_off_running_move_step() {
    // 0.5 格/秒走一格需要 2000 ms，序列在 100+1500 时结束
    let (mut animator, queen, pawn) =
        lunge_animator(SequenceStep::attacker_move("lunge", 0.0, Some(0.5), false), 100.0);
    let target = animator.choreographer().layout().board_to_world(sq("d7"));

    animator.execute_move(queen, 3, 6, None).unwrap();
    let events = run_until(&mut animator, 600, |a, _| a.now_ms() >= 1700.0);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::Settled { .. })));
    let entity = animator.entity(queen).unwrap();
    assert!(entity.is_moving());
    assert_eq!(entity.state, PieceState::Attacking);

    // 移动步骤到达后直接收尾，没有另一段行走
    let events = run_until(&mut animator, 600, |_, events| {
        events
            .iter()
            .any(|e| matches!(e, ChoreographyEvent::Settled { piece, .. } if *piece == queen))
    });
    assert!(animator.now_ms() >= 2000.0 - 2.0 * FRAME_MS);
    assert!(animator.now_ms() <= 2000.0 + 2.0 * FRAME_MS);
    assert!(!clip_started(&events, queen, "walk"));
    let entity = animator.entity(queen).unwrap();
    assert_eq!(entity.state, PieceState::Idle);
    assert_eq!(entity.root.translation, target);
    assert!(animator.entity(pawn).is_none());
}

#[test]
fn test_re_move_discards_pending_warm_up() {
    let board = board_with(&[("d1", PieceType::Queen, Side::White), ("d7", PieceType::Pawn, Side::Black)]);
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        default_sequence(),
        warm_up_templates(),
    );
    animator.create_entities(&board).unwrap();
    let queen = animator.entity_at("d1").unwrap().id;
    let pawn = animator.entity_at("d7").unwrap().id;

    animator.execute_move(queen, 3, 6, None).unwrap();
    for _ in 0..10 {
        animator.advance(FRAME);
    }
    // 热身定时事件还没触发就改走 h7
    animator.execute_move(queen, 7, 6, None).unwrap();

    let events = run_until(&mut animator, 1200, |a, _| a.is_settled());
    assert!(!pre_move_started(&events));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::SequenceStarted { .. })));
    assert!(has_removed(&events, pawn));
    let entity = animator.entity(queen).unwrap();
    assert_eq!(entity.state, PieceState::Idle);
    assert_eq!(entity.position, sq("h7"));
    assert_eq!(
        entity.root.translation,
        animator.choreographer().layout().board_to_world(sq("h7"))
    );
}

#[test]
fn test_re_move_discards_pending_arrival() {
    let board = board_with(&[("d1", PieceType::Queen, Side::White), ("d7", PieceType::Pawn, Side::Black)]);
    let mut animator = BoardAnimator::new(
        ChoreographyConfig::default(),
        AttributeConfig::default(),
        default_sequence(),
        attack_templates(),
    );
    animator.create_entities(&board).unwrap();
    let queen = animator.entity_at("d1").unwrap().id;
    let pawn = animator.entity_at("d7").unwrap().id;

    animator.execute_move(queen, 3, 6, None).unwrap();
    for _ in 0..10 {
        animator.advance(FRAME);
    }
    animator.drain_events();
    // 预移动途中改走，旧的到达记录作废
    animator.execute_move(queen, 7, 6, None).unwrap();

    let events = run_until(&mut animator, 1200, |a, _| a.is_settled());
    assert!(!events
        .iter()
        .any(|e| matches!(e, ChoreographyEvent::SequenceStarted { .. })));
    assert!(!clip_started(&events, pawn, "ready"));
    let settled: Vec<Position> = events
        .iter()
        .filter_map(|e| match e {
            ChoreographyEvent::Settled { piece, position } if *piece == queen => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(settled, vec![sq("h7")]);
    assert!(has_removed(&events, pawn));
    assert_eq!(animator.store().len(), 1);
}
