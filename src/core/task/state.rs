use serde::{Serialize, Deserialize};
use crate::core::error::DownloadError;

/// 下载任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    /// Completed 或 Failed，之后不再发生任何状态迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// 任务在某一时刻的快照，通过 watch 通道广播
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub progress: u8,
    /// 仅在 Failed 时存在
    pub error: Option<DownloadError>,
}

impl TaskSnapshot {
    pub fn pending() -> Self {
        Self { state: TaskState::Pending, progress: 0, error: None }
    }

    pub fn completed() -> Self {
        Self { state: TaskState::Completed, progress: 100, error: None }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
