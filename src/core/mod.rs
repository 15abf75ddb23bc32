//! Core: 下载任务 Actor、任务注册表、并发准入、顺序队列和错误类型

pub mod admission;
pub mod actor_manager;
pub mod error;
pub mod sequential;
pub mod task;

// 只导出主流程和其它模块实际用到的类型
pub use actor_manager::{DownloadKey, DownloadManager, DownloadManagerActor};
pub use admission::{Admission, AdmissionController};
pub use error::{DownloadError, DownloadResult};
pub use sequential::{QueueStatus, SequentialQueue, SequentialQueueActor};
pub use task::{DownloadHandle, HttpTransfer, TaskOutcome, TaskSnapshot, TaskState, Transfer, TransferOutcome};
