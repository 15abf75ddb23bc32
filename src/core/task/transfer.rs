//! 传输原语：把一个 URL 复制到本地路径
//!
//! 下载管理器本身不关心 HTTP 细节（重定向、TLS 等），只通过 [`Transfer`]
//! 拿到进度和最终结果。生产实现见 [`super::download::HttpTransfer`]。

use actix::Recipient;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

use super::messages::UpdateProgress;

/// 一次传输的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failure(String),
    Cancelled,
}

/// 进度上报器，把百分比转发给任务 Actor
#[derive(Clone)]
pub struct ProgressReporter {
    recipient: Option<Recipient<UpdateProgress>>,
}

impl ProgressReporter {
    pub fn new(recipient: Recipient<UpdateProgress>) -> Self {
        Self { recipient: Some(recipient) }
    }

    /// 不转发任何进度
    pub fn noop() -> Self {
        Self { recipient: None }
    }

    pub fn report(&self, progress: u8) {
        if let Some(recipient) = &self.recipient {
            recipient.do_send(UpdateProgress { progress: progress.min(100) });
        }
    }
}

/// 取消标记，传输实现应在读写数据块之间检查
#[derive(Clone)]
pub struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelFlag {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// 直到被取消才返回
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // 发送端由 self 持有，不会提前关闭
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// 传输能力
///
/// 实现者负责把 `url` 的内容写到 `destination`，并在结束时返回
/// 成功、失败或取消。允许返回非 `Send` 的 future（awc 客户端不是 `Send`），
/// 任务 Actor 会在自己所在的 Arbiter 上驱动它。
#[async_trait(?Send)]
pub trait Transfer: 'static {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressReporter,
        cancel: CancelFlag,
    ) -> TransferOutcome;
}
