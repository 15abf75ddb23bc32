//! 顺序下载队列：同一时间最多一个任务，可暂停
//!
//! 初始为暂停状态，`start` 之后才会提升队首。暂停不会打断正在进行的传输，
//! 只是不再提升下一个。

use actix::prelude::*;
use log::{debug, info};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::core::error::DownloadResult;
use crate::core::task::{DescriptorStore, DownloadHandle, DownloadTaskActor, JsonDescriptorStore, Transfer};
use crate::utils::validator::{parse_url, validate_file_name};

/// 追加一个已创建的任务
pub struct Enqueue(pub DownloadHandle);
impl Message for Enqueue { type Result = (); }

/// 在下载目录下创建任务并追加
pub struct EnqueueDownload {
    pub url: String,
    pub file_name: String,
}
impl Message for EnqueueDownload { type Result = DownloadResult<DownloadHandle>; }

pub struct StartQueue;
impl Message for StartQueue { type Result = (); }

pub struct PauseQueue;
impl Message for PauseQueue { type Result = (); }

/// 队列当前状态
#[derive(Debug, Clone)]
pub struct QueueStatus {
    pub paused: bool,
    pub pending: usize,
    pub active: Option<DownloadHandle>,
}

pub struct QueryQueue;
impl Message for QueryQueue { type Result = QueueStatus; }

/// 订阅“队列已空”：当前任务结束且没有等待中的任务时触发
pub struct SubscribeDrained;
impl Message for SubscribeDrained { type Result = UnboundedReceiver<()>; }

pub struct SequentialQueueActor {
    download_dir: PathBuf,
    transfer: Arc<dyn Transfer>,
    descriptors: Option<Arc<dyn DescriptorStore>>,
    backlog: VecDeque<DownloadHandle>,
    active: Option<DownloadHandle>,
    paused: bool,
    drained_subscribers: Vec<UnboundedSender<()>>,
}

impl Actor for SequentialQueueActor {
    type Context = Context<Self>;
}

impl SequentialQueueActor {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        transfer: Arc<dyn Transfer>,
        descriptors: Option<Arc<dyn DescriptorStore>>,
    ) -> DownloadResult<Self> {
        let download_dir = download_dir.into();
        std::fs::create_dir_all(&download_dir)?;
        Ok(Self {
            download_dir,
            transfer,
            descriptors,
            backlog: VecDeque::new(),
            active: None,
            paused: true,
            drained_subscribers: Vec::new(),
        })
    }

    pub fn from_config(config: &Config, transfer: Arc<dyn Transfer>) -> DownloadResult<Self> {
        let descriptors: Option<Arc<dyn DescriptorStore>> = if config.enable_resume {
            Some(Arc::new(JsonDescriptorStore))
        } else {
            None
        };
        Self::new(&config.download_dir, transfer, descriptors)
    }

    fn push(&mut self, handle: DownloadHandle, ctx: &mut Context<Self>) {
        debug!("加入顺序队列: {}", handle.url());
        self.backlog.push_back(handle);
        if !self.paused && self.active.is_none() {
            self.promote_next(ctx);
        }
    }

    /// 提升队首；队列为空时通知订阅者
    fn promote_next(&mut self, ctx: &mut Context<Self>) {
        let Some(handle) = self.backlog.pop_front() else {
            info!("顺序队列已空");
            self.drained_subscribers.retain(|tx| tx.send(()).is_ok());
            return;
        };

        info!("顺序队列开始: {}", handle.url());
        handle.start();
        self.active = Some(handle.clone());

        ctx.spawn(
            async move { handle.wait().await }
                .into_actor(self)
                .map(|outcome, act, ctx| {
                    debug!("顺序队列任务结束: {:?}", outcome);
                    act.active = None;
                    if !act.paused {
                        act.promote_next(ctx);
                    }
                }),
        );
    }
}

impl Handler<Enqueue> for SequentialQueueActor {
    type Result = ();
    fn handle(&mut self, msg: Enqueue, ctx: &mut Self::Context) {
        self.push(msg.0, ctx);
    }
}

impl Handler<EnqueueDownload> for SequentialQueueActor {
    type Result = DownloadResult<DownloadHandle>;
    fn handle(&mut self, msg: EnqueueDownload, ctx: &mut Self::Context) -> Self::Result {
        let url = parse_url(&msg.url)?;
        validate_file_name(&msg.file_name)?;
        let file = self.download_dir.join(&msg.file_name);
        let handle = DownloadTaskActor::new(url, file, self.transfer.clone(), self.descriptors.clone()).launch();
        self.push(handle.clone(), ctx);
        Ok(handle)
    }
}

impl Handler<StartQueue> for SequentialQueueActor {
    type Result = ();
    fn handle(&mut self, _msg: StartQueue, ctx: &mut Self::Context) {
        if !self.paused {
            return;
        }
        info!("顺序队列继续");
        self.paused = false;
        // 暂停期间最后一个任务已结束时，这里负责通知队列已空
        if self.active.is_none() {
            self.promote_next(ctx);
        }
    }
}

impl Handler<PauseQueue> for SequentialQueueActor {
    type Result = ();
    fn handle(&mut self, _msg: PauseQueue, _ctx: &mut Self::Context) {
        if !self.paused {
            info!("顺序队列暂停，当前任务会继续完成");
        }
        self.paused = true;
    }
}

impl Handler<QueryQueue> for SequentialQueueActor {
    type Result = MessageResult<QueryQueue>;
    fn handle(&mut self, _msg: QueryQueue, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(QueueStatus {
            paused: self.paused,
            pending: self.backlog.len(),
            active: self.active.clone(),
        })
    }
}

impl Handler<SubscribeDrained> for SequentialQueueActor {
    type Result = MessageResult<SubscribeDrained>;
    fn handle(&mut self, _msg: SubscribeDrained, _ctx: &mut Self::Context) -> Self::Result {
        let (tx, rx) = mpsc::unbounded_channel();
        self.drained_subscribers.push(tx);
        MessageResult(rx)
    }
}

/// 顺序队列句柄
#[derive(Clone)]
pub struct SequentialQueue {
    addr: Addr<SequentialQueueActor>,
}

impl SequentialQueue {
    pub fn launch(actor: SequentialQueueActor) -> Self {
        Self { addr: actor.start() }
    }

    pub fn from_config(config: &Config, transfer: Arc<dyn Transfer>) -> DownloadResult<Self> {
        Ok(Self::launch(SequentialQueueActor::from_config(config, transfer)?))
    }

    pub async fn enqueue(&self, handle: DownloadHandle) -> DownloadResult<()> {
        Ok(self.addr.send(Enqueue(handle)).await?)
    }

    pub async fn enqueue_download(&self, url: &str, file_name: &str) -> DownloadResult<DownloadHandle> {
        self.addr
            .send(EnqueueDownload { url: url.to_string(), file_name: file_name.to_string() })
            .await?
    }

    pub async fn start(&self) -> DownloadResult<()> {
        Ok(self.addr.send(StartQueue).await?)
    }

    pub async fn pause(&self) -> DownloadResult<()> {
        Ok(self.addr.send(PauseQueue).await?)
    }

    pub async fn status(&self) -> DownloadResult<QueueStatus> {
        Ok(self.addr.send(QueryQueue).await?)
    }

    pub async fn is_paused(&self) -> DownloadResult<bool> {
        Ok(self.status().await?.paused)
    }

    /// 等待中的任务数，不含正在进行的
    pub async fn len(&self) -> DownloadResult<usize> {
        Ok(self.status().await?.pending)
    }

    pub async fn subscribe_drained(&self) -> DownloadResult<UnboundedReceiver<()>> {
        Ok(self.addr.send(SubscribeDrained).await?)
    }
}
