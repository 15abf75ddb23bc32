//! 并发准入控制
//!
//! 纯数据结构，不做任何 I/O；由管理器 Actor 在自己的消息处理器里驱动，
//! 根据返回的 [`Admission`] 决定启动哪些任务、是否发出“工作停止”通知。

use std::collections::VecDeque;

/// 一次状态变更的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission<T> {
    /// 按 FIFO 顺序被提升为运行中的条目
    pub promoted: Vec<T>,
    /// 本次变更让系统从忙碌变为空闲
    pub work_stopped: bool,
}

impl<T> Admission<T> {
    fn idle() -> Self {
        Self { promoted: Vec::new(), work_stopped: false }
    }
}

/// 上限 + FIFO 等待队列
///
/// 上限 `<= 0` 时不再提升任何条目；降低上限不会中断已经在运行的条目。
#[derive(Debug)]
pub struct AdmissionController<T> {
    ceiling: isize,
    running: usize,
    backlog: VecDeque<T>,
    busy: bool,
}

impl<T: PartialEq> AdmissionController<T> {
    pub fn new(ceiling: isize) -> Self {
        Self {
            ceiling,
            running: 0,
            backlog: VecDeque::new(),
            busy: false,
        }
    }

    pub fn ceiling(&self) -> isize {
        self.ceiling
    }

    pub fn running(&self) -> usize {
        self.running
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// 有条目在运行或在等待
    pub fn is_working(&self) -> bool {
        self.running > 0 || !self.backlog.is_empty()
    }

    pub fn contains_pending(&self, item: &T) -> bool {
        self.backlog.contains(item)
    }

    /// 追加到队尾，容量允许时立即提升
    pub fn enqueue(&mut self, item: T) -> Admission<T> {
        self.backlog.push_back(item);
        self.busy = true;
        self.evaluate(false)
    }

    /// 修改上限；提高时按 FIFO 提升，降低时只影响以后的提升
    pub fn set_ceiling(&mut self, ceiling: isize) -> Admission<T> {
        self.ceiling = ceiling;
        self.evaluate(false)
    }

    /// 一个运行中的条目进入终态
    pub fn task_finished(&mut self) -> Admission<T> {
        self.running = self.running.saturating_sub(1);
        self.evaluate(true)
    }

    /// 从等待队列里移除尚未提升的条目；不在队列里时返回 `None`
    pub fn cancel_pending(&mut self, item: &T) -> Option<Admission<T>> {
        let index = self.backlog.iter().position(|pending| pending == item)?;
        self.backlog.remove(index);
        Some(self.evaluate(true))
    }

    /// 反复提升队首直到达到上限，再判断是否刚刚变为空闲
    fn evaluate(&mut self, allow_stop: bool) -> Admission<T> {
        let mut admission = Admission::idle();
        while (self.running as isize) < self.ceiling {
            let Some(item) = self.backlog.pop_front() else { break };
            self.running += 1;
            admission.promoted.push(item);
        }

        if allow_stop && self.busy && !self.is_working() {
            self.busy = false;
            admission.work_stopped = true;
        }
        admission
    }
}
