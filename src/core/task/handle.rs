use actix::Addr;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use url::Url;

use crate::core::error::{DownloadError, DownloadResult};
use super::actor::DownloadTaskActor;
use super::messages::{CancelTask, StartTask, SubscribeCompletion, SubscribeProgress};
use super::state::{TaskSnapshot, TaskState};
use super::TaskOutcome;

/// 任务句柄，可廉价克隆
///
/// 只要还有句柄存在，任务 Actor 就不会停止。
#[derive(Clone)]
pub struct DownloadHandle {
    addr: Addr<DownloadTaskActor>,
    status: watch::Receiver<TaskSnapshot>,
    url: Url,
    file: PathBuf,
}

impl DownloadHandle {
    pub(super) fn new(
        addr: Addr<DownloadTaskActor>,
        status: watch::Receiver<TaskSnapshot>,
        url: Url,
        file: PathBuf,
    ) -> Self {
        Self { addr, status, url, file }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn file_path(&self) -> &Path {
        &self.file
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> TaskState {
        self.status.borrow().state
    }

    /// 最近一次上报的百分比，首次上报前为 0
    pub fn progress(&self) -> u8 {
        self.status.borrow().progress
    }

    pub fn is_completed(&self) -> bool {
        self.state() == TaskState::Completed
    }

    pub fn start(&self) {
        self.addr.do_send(StartTask);
    }

    pub fn cancel(&self) {
        self.addr.do_send(CancelTask);
    }

    pub async fn subscribe_progress(&self) -> DownloadResult<UnboundedReceiver<u8>> {
        Ok(self.addr.send(SubscribeProgress).await?)
    }

    /// 订阅之后发生的完成事件；已经发生过的不会补发，需要结果请用 [`Self::wait`]
    pub async fn subscribe_completion(&self) -> DownloadResult<UnboundedReceiver<TaskOutcome>> {
        Ok(self.addr.send(SubscribeCompletion).await?)
    }

    /// 等待任务进入终态，已是终态时立即返回
    ///
    /// 传输永远不结束时会一直等待下去。
    pub async fn wait(&self) -> TaskOutcome {
        let mut status = self.status.clone();
        let snapshot = match status.wait_for(|snapshot| snapshot.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => return Err(DownloadError::TaskAborted),
        };
        match snapshot.state {
            TaskState::Completed => Ok(self.file.clone()),
            _ => Err(snapshot.error.unwrap_or(DownloadError::TaskAborted)),
        }
    }

    /// 阻塞当前线程直到终态，不能在 Actor 所在的线程上调用
    pub fn wait_blocking(&self) -> TaskOutcome {
        futures::executor::block_on(self.wait())
    }
}

impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("url", &self.url.as_str())
            .field("file", &self.file)
            .field("snapshot", &*self.status.borrow())
            .finish()
    }
}
