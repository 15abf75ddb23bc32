use actix::{ActorFutureExt, AsyncContext, Handler, MessageResult, WrapFuture};
use log::{debug, info};
use tokio::sync::mpsc;

use crate::core::error::DownloadError;
use super::actor::DownloadTaskActor;
use super::messages::*;
use super::state::TaskState;
use super::transfer::ProgressReporter;

impl Handler<StartTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: StartTask, ctx: &mut Self::Context) {
        match self.state {
            TaskState::Completed | TaskState::Failed => {
                debug!("{} 已处于终态 {:?}，重新发出完成通知", self.file.display(), self.state);
                self.notify_completion();
            }
            TaskState::Running => {}
            TaskState::Pending => {
                info!("开始下载: {} -> {}", self.url, self.file.display());
                self.state = TaskState::Running;
                self.publish();

                let transfer = self.transfer.clone();
                let url = self.url.clone();
                let file = self.file.clone();
                let reporter = ProgressReporter::new(ctx.address().recipient());
                let cancel = self.is_cancelled.clone();

                ctx.spawn(
                    async move { transfer.fetch(&url, &file, reporter, cancel).await }
                        .into_actor(self)
                        .map(|outcome, act, _ctx| act.finish(outcome)),
                );
            }
        }
    }
}

impl Handler<CancelTask> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, _msg: CancelTask, _ctx: &mut Self::Context) {
        match self.state {
            TaskState::Running => {
                info!("请求取消下载: {}", self.url);
                self.is_cancelled.cancel();
            }
            TaskState::Pending => {
                // 从未开始的任务直接进入终态，释放等待者
                self.state = TaskState::Failed;
                self.error = Some(DownloadError::Cancelled);
                self.remove_file();
                self.record_descriptor(false);
                self.publish();
                self.notify_completion();
            }
            TaskState::Completed => {
                self.remove_file();
                self.record_descriptor(false);
            }
            TaskState::Failed => self.remove_file(),
        }
    }
}

impl Handler<UpdateProgress> for DownloadTaskActor {
    type Result = ();
    fn handle(&mut self, msg: UpdateProgress, _ctx: &mut Self::Context) {
        // 只在运行中接受进度，且保持单调不减
        if self.state != TaskState::Running || msg.progress <= self.progress {
            return;
        }
        self.progress = msg.progress.min(100);
        self.publish();
        self.notify_progress();
    }
}

impl Handler<SubscribeProgress> for DownloadTaskActor {
    type Result = MessageResult<SubscribeProgress>;
    fn handle(&mut self, _msg: SubscribeProgress, _ctx: &mut Self::Context) -> Self::Result {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress_subscribers.push(tx);
        MessageResult(rx)
    }
}

impl Handler<SubscribeCompletion> for DownloadTaskActor {
    type Result = MessageResult<SubscribeCompletion>;
    fn handle(&mut self, _msg: SubscribeCompletion, _ctx: &mut Self::Context) -> Self::Result {
        let (tx, rx) = mpsc::unbounded_channel();
        self.completion_subscribers.push(tx);
        MessageResult(rx)
    }
}
