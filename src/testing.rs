//! 测试用的传输与描述文件存储

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use url::Url;

use crate::core::error::DownloadError;
use crate::core::task::descriptor::{DescriptorStore, FileDescriptor};
use crate::core::task::transfer::{CancelFlag, ProgressReporter, Transfer, TransferOutcome};

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    in_flight: HashMap<String, (oneshot::Sender<TransferOutcome>, ProgressReporter)>,
}

/// 可编排的传输
///
/// - `manual`: 传输挂起，直到测试调用 [`FakeTransfer::complete`] 或任务被取消
/// - `immediate`: 每次调用都立刻返回给定结果
///
/// 成功时会在目标路径写入一个小文件。
pub struct FakeTransfer {
    immediate: Option<TransferOutcome>,
    state: Mutex<FakeState>,
}

impl FakeTransfer {
    pub fn manual() -> Arc<Self> {
        Arc::new(Self { immediate: None, state: Mutex::new(FakeState::default()) })
    }

    pub fn immediate(outcome: TransferOutcome) -> Arc<Self> {
        Arc::new(Self { immediate: Some(outcome), state: Mutex::new(FakeState::default()) })
    }

    /// 按调用顺序排列的 URL
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// 结束一个挂起中的传输；该 URL 没有挂起的传输时返回 false
    pub fn complete(&self, url: &str, outcome: TransferOutcome) -> bool {
        let entry = self.state.lock().unwrap().in_flight.remove(url);
        match entry {
            Some((tx, _)) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn report(&self, url: &str, progress: u8) {
        if let Some((_, reporter)) = self.state.lock().unwrap().in_flight.get(url) {
            reporter.report(progress);
        }
    }

    fn finish(destination: &Path, outcome: TransferOutcome) -> TransferOutcome {
        if outcome == TransferOutcome::Success {
            if let Err(e) = std::fs::write(destination, b"fake") {
                return TransferOutcome::Failure(e.to_string());
            }
        }
        outcome
    }
}

#[async_trait(?Send)]
impl Transfer for FakeTransfer {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressReporter,
        cancel: CancelFlag,
    ) -> TransferOutcome {
        let key = url.to_string();
        self.state.lock().unwrap().calls.push(key.clone());

        if let Some(outcome) = &self.immediate {
            return Self::finish(destination, outcome.clone());
        }

        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().in_flight.insert(key.clone(), (tx, progress));

        let outcome = tokio::select! {
            outcome = rx => outcome.unwrap_or_else(|_| TransferOutcome::Failure("传输被丢弃".to_string())),
            _ = cancel.cancelled() => {
                self.state.lock().unwrap().in_flight.remove(&key);
                TransferOutcome::Cancelled
            }
        };
        Self::finish(destination, outcome)
    }
}

/// 内存中的描述文件存储
#[derive(Default)]
pub struct MemoryDescriptorStore {
    entries: Mutex<HashMap<PathBuf, FileDescriptor>>,
}

impl MemoryDescriptorStore {
    pub fn get(&self, path: &Path) -> Option<FileDescriptor> {
        self.entries.lock().unwrap().get(path).cloned()
    }

    pub fn insert(&self, path: &Path, descriptor: FileDescriptor) {
        self.entries.lock().unwrap().insert(path.to_path_buf(), descriptor);
    }
}

impl DescriptorStore for MemoryDescriptorStore {
    fn read(&self, path: &Path) -> Result<Option<FileDescriptor>, DownloadError> {
        Ok(self.get(path))
    }

    fn write(&self, path: &Path, descriptor: &FileDescriptor) -> Result<(), DownloadError> {
        self.insert(path, descriptor.clone());
        Ok(())
    }
}
