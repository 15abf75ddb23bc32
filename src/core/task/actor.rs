use actix::prelude::*;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use url::Url;

use crate::core::error::DownloadError;
use super::descriptor::{DescriptorSlot, DescriptorStore};
use super::handle::DownloadHandle;
use super::state::{TaskSnapshot, TaskState};
use super::transfer::{CancelFlag, Transfer, TransferOutcome};
use super::TaskOutcome;

/// 单任务 Actor
///
/// 状态只在自己的消息处理器里修改；终态通过 watch 通道广播给所有等待者。
pub struct DownloadTaskActor {
    pub url: Url,
    pub file: PathBuf,
    pub state: TaskState,
    pub progress: u8,
    pub error: Option<DownloadError>,
    pub is_cancelled: CancelFlag,
    pub(super) transfer: Arc<dyn Transfer>,
    pub(super) descriptor: Option<DescriptorSlot>,
    pub(super) status_tx: watch::Sender<TaskSnapshot>,
    pub(super) progress_subscribers: Vec<UnboundedSender<u8>>,
    pub(super) completion_subscribers: Vec<UnboundedSender<TaskOutcome>>,
}

impl Actor for DownloadTaskActor {
    type Context = Context<Self>;
}

impl DownloadTaskActor {
    /// 创建任务
    ///
    /// 配置了描述文件存储时以描述文件为准；否则目标文件已存在即视为已完成。
    pub fn new(
        url: Url,
        file: PathBuf,
        transfer: Arc<dyn Transfer>,
        descriptors: Option<Arc<dyn DescriptorStore>>,
    ) -> Self {
        let descriptor = descriptors.map(|store| DescriptorSlot::open(store, &file, &url));
        let already_done = match &descriptor {
            Some(slot) => slot.is_completed(),
            None => file.exists(),
        };

        let snapshot = if already_done {
            debug!("{} 已下载过，跳过传输", file.display());
            TaskSnapshot::completed()
        } else {
            TaskSnapshot::pending()
        };
        let (status_tx, _status_rx) = watch::channel(snapshot.clone());

        Self {
            url,
            file,
            state: snapshot.state,
            progress: snapshot.progress,
            error: None,
            is_cancelled: CancelFlag::new(),
            transfer,
            descriptor,
            status_tx,
            progress_subscribers: Vec::new(),
            completion_subscribers: Vec::new(),
        }
    }

    /// 在当前 Arbiter 上启动 Actor，返回任务句柄
    pub fn launch(self) -> DownloadHandle {
        let url = self.url.clone();
        let file = self.file.clone();
        let status = self.status_tx.subscribe();
        let addr = self.start();
        DownloadHandle::new(addr, status, url, file)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            state: self.state,
            progress: self.progress,
            error: self.error.clone(),
        }
    }

    pub(super) fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }

    /// 按订阅顺序发出进度事件，丢弃已关闭的订阅者
    pub(super) fn notify_progress(&mut self) {
        let progress = self.progress;
        self.progress_subscribers.retain(|tx| tx.send(progress).is_ok());
    }

    /// 按订阅顺序发出完成事件；非终态时什么也不做
    pub(super) fn notify_completion(&mut self) {
        let outcome: TaskOutcome = match self.state {
            TaskState::Completed => Ok(self.file.clone()),
            TaskState::Failed => Err(self.error.clone().unwrap_or(DownloadError::TaskAborted)),
            _ => return,
        };
        self.completion_subscribers.retain(|tx| tx.send(outcome.clone()).is_ok());
    }

    /// 处理传输终态
    pub(super) fn finish(&mut self, outcome: TransferOutcome) {
        if self.state.is_terminal() {
            return;
        }
        match outcome {
            TransferOutcome::Success => {
                info!("下载完成: {} -> {}", self.url, self.file.display());
                self.state = TaskState::Completed;
                self.error = None;
                if self.progress < 100 {
                    self.progress = 100;
                    self.notify_progress();
                }
                self.record_descriptor(true);
            }
            TransferOutcome::Failure(cause) => {
                error!("下载失败: {} - {}", self.url, cause);
                self.state = TaskState::Failed;
                self.error = Some(DownloadError::TransferFailed(cause));
                self.record_descriptor(false);
            }
            TransferOutcome::Cancelled => {
                info!("下载已取消: {}", self.url);
                self.state = TaskState::Failed;
                self.error = Some(DownloadError::Cancelled);
                self.record_descriptor(false);
                if self.is_cancelled.is_cancelled() {
                    self.remove_file();
                }
            }
        }
        self.publish();
        self.notify_completion();
    }

    pub(super) fn record_descriptor(&mut self, completed: bool) {
        if let Some(slot) = &mut self.descriptor {
            slot.record(completed);
        }
    }

    /// 删除目标路径上的（部分）文件
    pub(super) fn remove_file(&self) {
        if self.file.exists() {
            match std::fs::remove_file(&self.file) {
                Ok(()) => debug!("已删除 {}", self.file.display()),
                Err(e) => warn!("删除 {} 失败: {}", self.file.display(), e),
            }
        }
    }
}
