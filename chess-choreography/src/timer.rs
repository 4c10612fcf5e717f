//! 虚拟时钟上的定时事件队列
//!
//! 时间只在调用 `advance` 时前进，测试可以手动推进时钟。
//! 到期事件按触发时间排序，时间相同的按安排顺序。

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// 已安排的事件
#[derive(Debug)]
struct Scheduled<E> {
    fire_at: f64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    // BinaryHeap 是大顶堆，反转后最早的在堆顶
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// 定时事件队列
#[derive(Debug)]
pub struct TimerQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    now_ms: f64,
    next_seq: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now_ms: 0.0,
            next_seq: 0,
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前虚拟时间（毫秒）
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// 在 `delay_ms` 毫秒后触发
    pub fn schedule_in(&mut self, delay_ms: f64, event: E) {
        let delay = if delay_ms.is_finite() { delay_ms.max(0.0) } else { 0.0 };
        self.schedule_at(self.now_ms + delay, event);
    }

    /// 在指定时间触发，早于当前时间的在下次推进时立即触发
    pub fn schedule_at(&mut self, fire_at: f64, event: E) {
        let fire_at = if fire_at.is_finite() { fire_at } else { self.now_ms };
        self.next_seq += 1;
        self.heap.push(Scheduled {
            fire_at,
            seq: self.next_seq,
            event,
        });
    }

    /// 推进时钟，返回到期的事件
    pub fn advance(&mut self, dt_ms: f64) -> Vec<E> {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.now_ms += dt_ms;
        }
        self.drain_due()
    }

    /// 取出当前时间已到期的事件，不推进时钟
    pub fn drain_due(&mut self) -> Vec<E> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|next| next.fire_at <= self.now_ms) {
            if let Some(scheduled) = self.heap.pop() {
                due.push(scheduled.event);
            }
        }
        due
    }

    /// 下一个事件的触发时间
    pub fn next_fire_at(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.fire_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 丢弃所有未触发的事件，时钟不变
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
