//! 逐帧位移/旋转插值
//!
//! 位移和旋转互相独立。到达时精确对齐目标并清除目标；
//! 到达记录只在这里取出，发出请求的调用本身永远不会触发它。

use bevy::math::{Quat, Vec3};

use crate::entity::{Arrival, MotionTarget, PieceId, RotationTarget};
use crate::store::PieceStore;

/// 小于这个角度（弧度）视为已转到位
const ANGLE_EPSILON: f32 = 1e-4;

/// 位移一帧，返回新位置和是否到达
pub fn step_position(current: Vec3, motion: &MotionTarget, dt: f32) -> (Vec3, bool) {
    if !(motion.speed.is_finite() && motion.speed > 0.0) {
        return (motion.target, true);
    }

    let offset = motion.target - current;
    let distance = offset.length();
    let step = motion.speed * dt.max(0.0);
    if distance <= step || distance <= f32::EPSILON {
        return (motion.target, true);
    }

    (current + offset / distance * step, false)
}

/// 旋转一帧，返回新朝向和是否到达
pub fn step_rotation(current: Quat, rotation: &RotationTarget, dt: f32) -> (Quat, bool) {
    if !(rotation.speed.is_finite() && rotation.speed > 0.0) {
        return (rotation.target, true);
    }

    let remaining = current.angle_between(rotation.target);
    if !remaining.is_finite() || remaining <= ANGLE_EPSILON {
        return (rotation.target, true);
    }

    let fraction = (rotation.speed * dt.max(0.0) / remaining).min(1.0);
    if fraction >= 1.0 {
        return (rotation.target, true);
    }
    (current.slerp(rotation.target, fraction), false)
}

/// 推进所有实体一帧，返回本帧取出的到达记录（按实体标识排序）
pub fn advance_all(store: &mut PieceStore, dt: f32) -> Vec<(PieceId, Arrival)> {
    let mut arrivals = Vec::new();

    for entity in store.iter_mut() {
        if let Some(motion) = entity.motion {
            let (position, arrived) = step_position(entity.root.translation, &motion, dt);
            entity.root.translation = position;
            if arrived {
                entity.motion = None;
                if let Some(arrival) = entity.on_arrive.take() {
                    arrivals.push((entity.id, arrival));
                }
            }
        }

        if let Some(rotation) = entity.rotation {
            let (orientation, arrived) = step_rotation(entity.root.rotation, &rotation, dt);
            entity.root.rotation = orientation;
            if arrived {
                entity.rotation = None;
            }
        }

        entity.mixer.update(dt);
    }

    arrivals.sort_by_key(|(id, _)| *id);
    arrivals
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{PieceType, Position, Side};

    use crate::assets::TemplateLibrary;
    use crate::attributes::AttributeResolver;
    use crate::layout::BoardLayout;
    use crate::store::SpawnContext;

    #[test]
    fn test_position_never_overshoots() {
        let start = Vec3::new(0.0, 0.0, 3.5);
        let target = Vec3::new(0.0, 0.0, -2.5);
        let motion = MotionTarget { target, speed: 4.0 };
        let total = start.distance(target);
        let direction = (target - start).normalize();

        let mut current = start;
        let mut frames = 0;
        loop {
            let (next, arrived) = step_position(current, &motion, 0.07);
            let travelled = (next - start).dot(direction);
            assert!(travelled <= total + 1e-5);
            current = next;
            frames += 1;
            if arrived {
                break;
            }
            assert!(frames < 1000);
        }
        // 到达时没有浮点残差
        assert_eq!(current, target);
    }

    #[test]
    fn test_invalid_speed_snaps() {
        let motion = MotionTarget {
            target: Vec3::X,
            speed: f32::NAN,
        };
        assert_eq!(step_position(Vec3::ZERO, &motion, 0.016), (Vec3::X, true));
    }

    #[test]
    fn test_rotation_snaps_on_arrival() {
        let target = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let rotation = RotationTarget { target, speed: 8.0 };

        let (halfway, arrived) = step_rotation(Quat::IDENTITY, &rotation, 0.1);
        assert!(!arrived);
        assert!((halfway.angle_between(target) - (std::f32::consts::FRAC_PI_2 - 0.8)).abs() < 1e-3);

        let (done, arrived) = step_rotation(halfway, &rotation, 0.1);
        assert!(arrived);
        assert_eq!(done, target);
    }

    #[test]
    fn test_arrival_released_once() {
        let templates = TemplateLibrary::new();
        let attributes = AttributeResolver::default();
        let layout = BoardLayout::default();
        let ctx = SpawnContext {
            templates: &templates,
            attributes: &attributes,
            layout: &layout,
        };

        let mut store = PieceStore::new();
        let e2 = Position::from_square("e2").unwrap();
        let e4 = Position::from_square("e4").unwrap();
        let id = store.create(Side::White, PieceType::Pawn, e2, ctx).unwrap();

        let entity = store.get_mut(id).unwrap();
        let token = entity.set_motion(layout.board_to_world(e4), 4.0, |token| Some(Arrival::Settle { token }));
        // 发出请求时不触发
        assert!(entity.on_arrive.is_some());

        assert!(advance_all(&mut store, 0.25).is_empty());
        let arrivals = advance_all(&mut store, 0.25);
        assert_eq!(arrivals, vec![(id, Arrival::Settle { token })]);
        assert!(advance_all(&mut store, 0.25).is_empty());

        let entity = store.get(id).unwrap();
        assert_eq!(entity.root.translation, layout.board_to_world(e4));
        assert!(entity.motion.is_none());
    }
}
