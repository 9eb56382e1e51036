//! 延时任务队列
//!
//! 浮层的延迟移除和错误提示的自动消失都登记在这里。
//! 队列本身不计时：调用方传入当前时间，取出到期的任务执行。

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

/// 定时器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// 延时任务
#[derive(Debug, Clone)]
pub enum TimerTask {
    /// 移除未固定的浮层
    RemoveOverlay { overlay: Handle },
    /// 移除错误提示
    DismissIndicator { indicator: Handle },
}

#[derive(Debug)]
struct Scheduled {
    id: TimerId,
    due: Instant,
    task: TimerTask,
}

/// 定时器队列
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: Cell<u64>,
    scheduled: RefCell<Vec<Scheduled>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从现在起 `delay` 后到期
    pub fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        self.schedule_at(Instant::now() + delay, task)
    }

    pub fn schedule_at(&self, due: Instant, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.scheduled.borrow_mut().push(Scheduled { id, due, task });
        id
    }

    /// 取消；已执行或不存在时返回 `false`
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut scheduled = self.scheduled.borrow_mut();
        let before = scheduled.len();
        scheduled.retain(|entry| entry.id != id);
        scheduled.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.scheduled.borrow().iter().any(|entry| entry.id == id)
    }

    /// 取出 `now` 之前到期的任务（按到期时间排序）
    pub fn take_due(&self, now: Instant) -> Vec<(TimerId, TimerTask)> {
        let mut scheduled = self.scheduled.borrow_mut();
        let (mut due, pending): (Vec<Scheduled>, Vec<Scheduled>) =
            scheduled.drain(..).partition(|entry| entry.due <= now);
        *scheduled = pending;
        due.sort_by_key(|entry| entry.due);
        due.into_iter().map(|entry| (entry.id, entry.task)).collect()
    }

    /// 最早的到期时间
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.borrow().iter().map(|entry| entry.due).min()
    }

    pub fn len(&self) -> usize {
        self.scheduled.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.scheduled.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_element;

    #[test]
    fn test_due_tasks_in_order_and_cancel() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let overlay = create_element("div", &[]);
        let late = queue.schedule_at(
            start + Duration::from_millis(150),
            TimerTask::RemoveOverlay {
                overlay: overlay.clone(),
            },
        );
        let early = queue.schedule_at(
            start + Duration::from_millis(100),
            TimerTask::DismissIndicator {
                indicator: overlay.clone(),
            },
        );
        let cancelled = queue.schedule_at(
            start + Duration::from_millis(50),
            TimerTask::RemoveOverlay { overlay },
        );

        assert!(queue.cancel(cancelled));
        assert!(!queue.cancel(cancelled));
        assert!(queue.take_due(start + Duration::from_millis(99)).is_empty());

        let due = queue.take_due(start + Duration::from_millis(200));
        let ids: Vec<TimerId> = due.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![early, late]);
        assert!(queue.is_empty());
    }
}
