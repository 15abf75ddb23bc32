//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `actor`: `DownloadTaskActor` 的定义
//! - `state`: 任务状态 `TaskState` 与快照
//! - `messages`: 发给任务 Actor 的消息
//! - `handlers`: 消息处理器
//! - `handle`: 调用方持有的 `DownloadHandle`
//! - `transfer`: 传输原语抽象
//! - `download`: 基于 awc 的 HTTP 传输
//! - `descriptor`: `.fds` 描述文件（断点判断）

use std::path::PathBuf;

pub mod actor;
pub mod state;
pub mod messages;
pub mod handlers;
pub mod handle;
pub mod transfer;
pub mod download;
pub mod descriptor;

pub use actor::DownloadTaskActor;
pub use handle::DownloadHandle;
pub use state::{TaskSnapshot, TaskState};
pub use transfer::{CancelFlag, ProgressReporter, Transfer, TransferOutcome};
pub use download::HttpTransfer;
pub use descriptor::{DescriptorStore, FileDescriptor, JsonDescriptorStore};

/// 任务终态：成功时为目标文件路径
pub type TaskOutcome = Result<PathBuf, crate::core::error::DownloadError>;
