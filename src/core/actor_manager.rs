//! 任务注册表 + 并发准入
//!
//! `DownloadManagerActor` 独占 key → 任务 的映射和 [`AdmissionController`]，
//! 查重、入队、提升都在同一个邮箱里串行完成，不需要任何锁。

use actix::prelude::*;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::core::admission::{Admission, AdmissionController};
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::task::{
    DescriptorStore, DownloadHandle, DownloadTaskActor, JsonDescriptorStore, TaskOutcome, TaskSnapshot,
    Transfer,
};
use crate::utils::validator::{parse_url, validate_file_name};

/// 可以作为任务 key 的类型
pub trait DownloadKey: Eq + Hash + Clone + Debug + Send + Unpin + 'static {}
impl<T> DownloadKey for T where T: Eq + Hash + Clone + Debug + Send + Unpin + 'static {}

// ================== 消息 ==================

/// 按 key 获取或创建任务；已存在时原样返回，不会再次入队
pub struct RequestDownload<K> {
    pub key: K,
    pub url: String,
    pub file_name: String,
}
impl<K: DownloadKey> Message for RequestDownload<K> { type Result = DownloadResult<DownloadHandle>; }

/// 查询已注册任务的句柄
pub struct GetHandle<K>(pub K);
impl<K: DownloadKey> Message for GetHandle<K> { type Result = DownloadResult<DownloadHandle>; }

/// 取消任务：等待中的从队列移除，运行中的请求中止
pub struct CancelDownload<K>(pub K);
impl<K: DownloadKey> Message for CancelDownload<K> { type Result = DownloadResult<()>; }

/// 修改并发上限
pub struct SetCeiling(pub isize);
impl Message for SetCeiling { type Result = (); }

/// 是否有任务在运行或排队
pub struct IsWorking;
impl Message for IsWorking { type Result = bool; }

/// 订阅“工作停止”事件
pub struct SubscribeWorkStopped;
impl Message for SubscribeWorkStopped { type Result = UnboundedReceiver<()>; }

/// 取消所有任务并删除目标文件
pub struct DeleteAll;
impl Message for DeleteAll { type Result = (); }

/// 列出全部任务（按 key 无序）
pub struct ListTasks<K>(std::marker::PhantomData<K>);
impl<K> Default for ListTasks<K> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}
impl<K: DownloadKey> Message for ListTasks<K> { type Result = Vec<(K, DownloadHandle)>; }

// ================== Actor ==================

/// 全局任务管理器 Actor
pub struct DownloadManagerActor<K: DownloadKey> {
    download_dir: PathBuf,
    transfer: Arc<dyn Transfer>,
    descriptors: Option<Arc<dyn DescriptorStore>>,
    tasks: HashMap<K, DownloadHandle>,
    admission: AdmissionController<K>,
    work_stopped_subscribers: Vec<UnboundedSender<()>>,
}

impl<K: DownloadKey> Actor for DownloadManagerActor<K> {
    type Context = Context<Self>;
}

impl<K: DownloadKey> DownloadManagerActor<K> {
    /// 创建管理器，并确保下载目录存在
    pub fn new(
        download_dir: impl Into<PathBuf>,
        ceiling: isize,
        transfer: Arc<dyn Transfer>,
        descriptors: Option<Arc<dyn DescriptorStore>>,
    ) -> DownloadResult<Self> {
        let download_dir = download_dir.into();
        std::fs::create_dir_all(&download_dir)?;
        Ok(Self {
            download_dir,
            transfer,
            descriptors,
            tasks: HashMap::new(),
            admission: AdmissionController::new(ceiling),
            work_stopped_subscribers: Vec::new(),
        })
    }

    /// 按配置创建；`enable_resume` 打开时使用 JSON 描述文件
    pub fn from_config(config: &Config, transfer: Arc<dyn Transfer>) -> DownloadResult<Self> {
        let descriptors: Option<Arc<dyn DescriptorStore>> = if config.enable_resume {
            Some(Arc::new(JsonDescriptorStore))
        } else {
            None
        };
        Self::new(&config.download_dir, config.max_concurrent_downloads, transfer, descriptors)
    }

    fn handle_of(&self, key: &K) -> DownloadResult<DownloadHandle> {
        self.tasks.get(key).cloned().ok_or_else(|| DownloadError::missing_key(key))
    }

    /// 启动被提升的任务，必要时发出“工作停止”
    fn apply(&mut self, admission: Admission<K>, ctx: &mut Context<Self>) {
        for key in admission.promoted {
            let Some(handle) = self.tasks.get(&key).cloned() else { continue };
            info!("准入任务 {:?} ({} 个运行中)", key, self.admission.running());
            handle.start();

            ctx.spawn(
                async move { handle.wait().await }
                    .into_actor(self)
                    .map(move |outcome: TaskOutcome, act, ctx| {
                        debug!("任务 {:?} 结束: {:?}", key, outcome);
                        let admission = act.admission.task_finished();
                        act.apply(admission, ctx);
                    }),
            );
        }

        if admission.work_stopped {
            info!("所有下载任务已结束");
            self.work_stopped_subscribers.retain(|tx| tx.send(()).is_ok());
        }
    }
}

impl<K: DownloadKey> Handler<RequestDownload<K>> for DownloadManagerActor<K> {
    type Result = DownloadResult<DownloadHandle>;
    fn handle(&mut self, msg: RequestDownload<K>, ctx: &mut Self::Context) -> Self::Result {
        if let Some(handle) = self.tasks.get(&msg.key) {
            debug!("任务 {:?} 已存在，直接返回", msg.key);
            return Ok(handle.clone());
        }

        let url = parse_url(&msg.url)?;
        validate_file_name(&msg.file_name)?;
        let file = self.download_dir.join(&msg.file_name);

        let handle = DownloadTaskActor::new(url, file, self.transfer.clone(), self.descriptors.clone()).launch();
        self.tasks.insert(msg.key.clone(), handle.clone());
        debug!("注册任务 {:?} -> {}", msg.key, handle.file_path().display());

        let admission = self.admission.enqueue(msg.key);
        self.apply(admission, ctx);
        Ok(handle)
    }
}

impl<K: DownloadKey> Handler<GetHandle<K>> for DownloadManagerActor<K> {
    type Result = DownloadResult<DownloadHandle>;
    fn handle(&mut self, msg: GetHandle<K>, _ctx: &mut Self::Context) -> Self::Result {
        self.handle_of(&msg.0)
    }
}

impl<K: DownloadKey> Handler<CancelDownload<K>> for DownloadManagerActor<K> {
    type Result = DownloadResult<()>;
    fn handle(&mut self, msg: CancelDownload<K>, ctx: &mut Self::Context) -> Self::Result {
        let handle = self.handle_of(&msg.0)?;
        handle.cancel();
        if let Some(admission) = self.admission.cancel_pending(&msg.0) {
            info!("已从等待队列移除 {:?}", msg.0);
            self.apply(admission, ctx);
        }
        Ok(())
    }
}

impl<K: DownloadKey> Handler<SetCeiling> for DownloadManagerActor<K> {
    type Result = ();
    fn handle(&mut self, msg: SetCeiling, ctx: &mut Self::Context) {
        info!("并发上限: {} -> {}", self.admission.ceiling(), msg.0);
        let admission = self.admission.set_ceiling(msg.0);
        self.apply(admission, ctx);
    }
}

impl<K: DownloadKey> Handler<IsWorking> for DownloadManagerActor<K> {
    type Result = MessageResult<IsWorking>;
    fn handle(&mut self, _msg: IsWorking, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.admission.is_working())
    }
}

impl<K: DownloadKey> Handler<SubscribeWorkStopped> for DownloadManagerActor<K> {
    type Result = MessageResult<SubscribeWorkStopped>;
    fn handle(&mut self, _msg: SubscribeWorkStopped, _ctx: &mut Self::Context) -> Self::Result {
        let (tx, rx) = mpsc::unbounded_channel();
        self.work_stopped_subscribers.push(tx);
        MessageResult(rx)
    }
}

impl<K: DownloadKey> Handler<DeleteAll> for DownloadManagerActor<K> {
    type Result = ();
    fn handle(&mut self, _msg: DeleteAll, ctx: &mut Self::Context) {
        info!("取消并删除全部 {} 个任务", self.tasks.len());
        let keys: Vec<K> = self.tasks.keys().cloned().collect();
        for key in keys {
            if let Some(handle) = self.tasks.get(&key) {
                handle.cancel();
            }
            if let Some(admission) = self.admission.cancel_pending(&key) {
                self.apply(admission, ctx);
            }
        }
    }
}

impl<K: DownloadKey> Handler<ListTasks<K>> for DownloadManagerActor<K> {
    type Result = MessageResult<ListTasks<K>>;
    fn handle(&mut self, _msg: ListTasks<K>, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.tasks.iter().map(|(k, h)| (k.clone(), h.clone())).collect())
    }
}

// ================== 调用方接口 ==================

/// 管理器句柄，可在线程之间克隆传递
pub struct DownloadManager<K: DownloadKey> {
    addr: Addr<DownloadManagerActor<K>>,
}

impl<K: DownloadKey> Clone for DownloadManager<K> {
    fn clone(&self) -> Self {
        Self { addr: self.addr.clone() }
    }
}

impl<K: DownloadKey> DownloadManager<K> {
    /// 在当前 Arbiter 上启动管理器 Actor
    pub fn launch(actor: DownloadManagerActor<K>) -> Self {
        Self { addr: actor.start() }
    }

    pub fn from_config(config: &Config, transfer: Arc<dyn Transfer>) -> DownloadResult<Self> {
        Ok(Self::launch(DownloadManagerActor::from_config(config, transfer)?))
    }

    /// 获取或创建 key 对应的任务
    pub async fn request_download(&self, key: K, url: &str, file_name: &str) -> DownloadResult<DownloadHandle> {
        self.addr
            .send(RequestDownload { key, url: url.to_string(), file_name: file_name.to_string() })
            .await?
    }

    /// 获取或创建任务后等待一次结果，不重试
    pub async fn fetch(&self, key: K, url: &str, file_name: &str) -> DownloadResult<PathBuf> {
        let handle = self.request_download(key, url, file_name).await?;
        handle.wait().await
    }

    /// 阻塞版本的 [`Self::fetch`]，不能在 Actor 所在的线程上调用
    pub fn fetch_blocking(&self, key: K, url: &str, file_name: &str) -> DownloadResult<PathBuf> {
        futures::executor::block_on(self.fetch(key, url, file_name))
    }

    pub async fn handle(&self, key: K) -> DownloadResult<DownloadHandle> {
        self.addr.send(GetHandle(key)).await?
    }

    pub async fn progress(&self, key: K) -> DownloadResult<u8> {
        Ok(self.handle(key).await?.progress())
    }

    pub async fn is_completed(&self, key: K) -> DownloadResult<bool> {
        Ok(self.handle(key).await?.is_completed())
    }

    pub async fn snapshot(&self, key: K) -> DownloadResult<TaskSnapshot> {
        Ok(self.handle(key).await?.snapshot())
    }

    pub async fn subscribe_progress(&self, key: K) -> DownloadResult<UnboundedReceiver<u8>> {
        self.handle(key).await?.subscribe_progress().await
    }

    pub async fn subscribe_completion(&self, key: K) -> DownloadResult<UnboundedReceiver<TaskOutcome>> {
        self.handle(key).await?.subscribe_completion().await
    }

    pub async fn set_ceiling(&self, ceiling: isize) -> DownloadResult<()> {
        Ok(self.addr.send(SetCeiling(ceiling)).await?)
    }

    pub async fn is_working(&self) -> DownloadResult<bool> {
        Ok(self.addr.send(IsWorking).await?)
    }

    pub async fn subscribe_work_stopped(&self) -> DownloadResult<UnboundedReceiver<()>> {
        Ok(self.addr.send(SubscribeWorkStopped).await?)
    }

    pub async fn cancel(&self, key: K) -> DownloadResult<()> {
        self.addr.send(CancelDownload(key)).await?
    }

    pub async fn delete_all(&self) -> DownloadResult<()> {
        Ok(self.addr.send(DeleteAll).await?)
    }

    pub async fn tasks(&self) -> DownloadResult<Vec<(K, DownloadHandle)>> {
        Ok(self.addr.send(ListTasks::default()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{TaskState, TransferOutcome};
    use crate::testing::{FakeTransfer, MemoryDescriptorStore};
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio_test::{assert_err, assert_ok};

    const A: &str = "http://example.com/a.bin";
    const B: &str = "http://example.com/b.bin";
    const C: &str = "http://example.com/c.bin";
    const D: &str = "http://example.com/d.bin";

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    fn manager(dir: &tempfile::TempDir, ceiling: isize, fake: Arc<FakeTransfer>) -> DownloadManager<&'static str> {
        DownloadManager::launch(DownloadManagerActor::new(dir.path(), ceiling, fake, None).unwrap())
    }

    fn name(url: &str) -> &str {
        url.rsplit('/').next().unwrap()
    }

    async fn request(manager: &DownloadManager<&'static str>, url: &'static str) -> DownloadHandle {
        manager.request_download(url, url, name(url)).await.unwrap()
    }

    #[actix_rt::test]
    async fn test_same_key_returns_same_task() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 3, fake.clone());

        let first = request(&manager, A).await;
        // 第二次请求即使参数不同也返回已有任务
        let second = manager.request_download(A, B, "other.bin").await.unwrap();
        settle().await;

        assert_eq!(first.file_path(), second.file_path());
        assert_eq!(second.url().as_str(), A);
        assert_eq!(fake.calls(), vec![A.to_string()]);
        assert_eq!(manager.tasks().await.unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_fifo_order_with_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        for url in [A, B, C] {
            request(&manager, url).await;
        }
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string()]);

        fake.complete(A, TransferOutcome::Success);
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string(), B.to_string()]);

        fake.complete(B, TransferOutcome::Failure("断开".to_string()));
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string(), B.to_string(), C.to_string()]);
    }

    #[actix_rt::test]
    async fn test_running_never_exceeds_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 2, fake.clone());

        let handles = futures::future::join_all([A, B, C, D].map(|url| request(&manager, url))).await;
        settle().await;

        assert_eq!(fake.calls().len(), 2);
        let running = handles.iter().filter(|h| h.state() == TaskState::Running).count();
        assert_eq!(running, 2);
        assert!(manager.is_working().await.unwrap());
    }

    #[actix_rt::test]
    async fn test_raising_ceiling_promotes_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        for url in [A, B, C] {
            request(&manager, url).await;
        }
        settle().await;
        assert_eq!(fake.calls().len(), 1);

        manager.set_ceiling(3).await.unwrap();
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string(), B.to_string(), C.to_string()]);
    }

    #[actix_rt::test]
    async fn test_zero_ceiling_queues_without_starting() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 0, fake.clone());

        let handle = request(&manager, A).await;
        settle().await;
        assert!(fake.calls().is_empty());
        assert_eq!(handle.state(), TaskState::Pending);
        assert!(manager.is_working().await.unwrap());

        manager.set_ceiling(1).await.unwrap();
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string()]);
    }

    #[actix_rt::test]
    async fn test_work_stopped_fires_once_per_idle_transition() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 2, fake.clone());
        let mut stopped = manager.subscribe_work_stopped().await.unwrap();

        // 空闲时修改上限不会触发
        manager.set_ceiling(3).await.unwrap();
        settle().await;
        assert_eq!(stopped.try_recv(), Err(TryRecvError::Empty));

        for url in [A, B, C] {
            request(&manager, url).await;
        }
        settle().await;
        fake.complete(A, TransferOutcome::Success);
        fake.complete(B, TransferOutcome::Failure("超时".to_string()));
        settle().await;
        assert_eq!(stopped.try_recv(), Err(TryRecvError::Empty));
        manager.set_ceiling(1).await.unwrap();
        assert_eq!(stopped.try_recv(), Err(TryRecvError::Empty));

        fake.complete(C, TransferOutcome::Success);
        let fired = tokio::time::timeout(Duration::from_secs(1), stopped.recv()).await;
        assert_eq!(fired.unwrap(), Some(()));
        settle().await;
        assert_eq!(stopped.try_recv(), Err(TryRecvError::Empty));
        assert!(!manager.is_working().await.unwrap());

        request(&manager, D).await;
        settle().await;
        fake.complete(D, TransferOutcome::Success);
        let fired = tokio::time::timeout(Duration::from_secs(1), stopped.recv()).await;
        assert_eq!(fired.unwrap(), Some(()));
    }

    #[actix_rt::test]
    async fn test_cancelled_pending_task_is_never_started() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        request(&manager, A).await;
        let b = request(&manager, B).await;
        request(&manager, C).await;
        settle().await;

        manager.cancel(B).await.unwrap();
        assert_eq!(assert_err!(b.wait().await), DownloadError::Cancelled);

        fake.complete(A, TransferOutcome::Success);
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string(), C.to_string()]);
    }

    #[actix_rt::test]
    async fn test_cancel_running_task_frees_slot() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        let a = request(&manager, A).await;
        request(&manager, B).await;
        settle().await;

        manager.cancel(A).await.unwrap();
        assert_eq!(assert_err!(a.wait().await), DownloadError::Cancelled);
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string(), B.to_string()]);
    }

    #[actix_rt::test]
    async fn test_unknown_key_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir, 1, FakeTransfer::manual());

        let error = assert_err!(manager.progress("missing").await);
        assert!(error.is_usage_error());
        assert!(matches!(manager.is_completed("missing").await, Err(DownloadError::MissingKey(_))));
        assert!(manager.subscribe_progress("missing").await.is_err());
        assert!(manager.subscribe_completion("missing").await.is_err());
        assert!(manager.cancel("missing").await.is_err());
    }

    #[actix_rt::test]
    async fn test_invalid_request_is_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir, 1, FakeTransfer::manual());

        let error = assert_err!(manager.request_download("bad", "not a url", "a.bin").await);
        assert!(matches!(error, DownloadError::InvalidUrl(_)));
        let error = assert_err!(manager.request_download("bad", A, "../a.bin").await);
        assert!(matches!(error, DownloadError::InvalidFileName(_)));
        assert!(manager.tasks().await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_fetch_returns_destination_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::immediate(TransferOutcome::Success);
        let manager = manager(&dir, 2, fake.clone());

        let path = assert_ok!(manager.fetch(A, A, "a.bin").await);
        assert_eq!(path, dir.path().join("a.bin"));
        assert!(path.exists());
        assert!(manager.is_completed(A).await.unwrap());
        assert_eq!(manager.progress(A).await.unwrap(), 100);

        let failing = FakeTransfer::immediate(TransferOutcome::Failure("500".to_string()));
        let other_dir = tempfile::tempdir().unwrap();
        let manager = self::manager(&other_dir, 2, failing);
        let error = assert_err!(manager.fetch(B, B, "b.bin").await);
        assert_eq!(error, DownloadError::TransferFailed("500".to_string()));
        assert_eq!(manager.snapshot(B).await.unwrap().state, TaskState::Failed);
    }

    #[actix_rt::test]
    async fn test_existing_destination_completes_without_transfer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"old").unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        let handle = request(&manager, A).await;
        assert!(handle.is_completed());
        assert_eq!(handle.progress(), 100);
        assert_ok!(handle.wait().await);
        settle().await;
        assert!(fake.calls().is_empty());
        assert!(!manager.is_working().await.unwrap());
    }

    #[actix_rt::test]
    async fn test_descriptor_store_overrides_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"partial").unwrap();
        let fake = FakeTransfer::manual();
        let store = Arc::new(MemoryDescriptorStore::default());
        let manager: DownloadManager<&'static str> = DownloadManager::launch(
            DownloadManagerActor::new(dir.path(), 1, fake.clone(), Some(store)).unwrap(),
        );

        // 没有描述文件，说明上次没有下载完成
        let handle = request(&manager, A).await;
        assert!(!handle.is_completed());
        settle().await;
        assert!(!handle.is_completed());
        assert_eq!(handle.state(), TaskState::Running);
        assert_eq!(fake.calls(), vec![A.to_string()]);
    }

    #[actix_rt::test]
    async fn test_progress_subscription_through_manager() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        request(&manager, A).await;
        let mut progress = manager.subscribe_progress(A).await.unwrap();
        let mut completion = manager.subscribe_completion(A).await.unwrap();
        settle().await;

        fake.report(A, 50);
        assert_eq!(progress.recv().await, Some(50));
        assert_eq!(manager.progress(A).await.unwrap(), 50);

        fake.complete(A, TransferOutcome::Success);
        assert_eq!(progress.recv().await, Some(100));
        assert_eq!(completion.recv().await, Some(Ok(dir.path().join("a.bin"))));
    }

    #[actix_rt::test]
    async fn test_delete_all_removes_files_and_stops_work() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());
        let mut stopped = manager.subscribe_work_stopped().await.unwrap();

        let a = request(&manager, A).await;
        let b = request(&manager, B).await;
        settle().await;
        std::fs::write(dir.path().join("a.bin"), b"part").unwrap();

        manager.delete_all().await.unwrap();
        assert_eq!(a.wait().await, Err(DownloadError::Cancelled));
        assert_eq!(b.wait().await, Err(DownloadError::Cancelled));

        let fired = tokio::time::timeout(Duration::from_secs(1), stopped.recv()).await;
        assert_eq!(fired.unwrap(), Some(()));
        assert!(!dir.path().join("a.bin").exists());
        assert_eq!(fake.calls(), vec![A.to_string()]);
    }

    #[actix_rt::test]
    async fn test_fetch_blocking_from_worker_thread() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransfer::manual();
        let manager = manager(&dir, 1, fake.clone());

        let worker = manager.clone();
        let blocking = actix_rt::task::spawn_blocking(move || worker.fetch_blocking(A, A, "a.bin"));
        settle().await;
        settle().await;
        assert_eq!(fake.calls(), vec![A.to_string()]);

        fake.complete(A, TransferOutcome::Success);
        let outcome = blocking.await.unwrap();
        assert_eq!(outcome, Ok(dir.path().join("a.bin")));
    }
}
