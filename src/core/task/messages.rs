use actix::Message;
use tokio::sync::mpsc::UnboundedReceiver;
use super::TaskOutcome;

/// 启动任务；终态任务会立即重新发出完成通知
pub struct StartTask;
impl Message for StartTask { type Result = (); }

/// 取消任务：运行中则请求传输中止，否则删除目标路径上的文件
pub struct CancelTask;
impl Message for CancelTask { type Result = (); }

/// 传输层上报的进度百分比
pub struct UpdateProgress {
    pub progress: u8,
}
impl Message for UpdateProgress { type Result = (); }

/// 订阅进度事件
pub struct SubscribeProgress;
impl Message for SubscribeProgress { type Result = UnboundedReceiver<u8>; }

/// 订阅完成事件
pub struct SubscribeCompletion;
impl Message for SubscribeCompletion { type Result = UnboundedReceiver<TaskOutcome>; }
