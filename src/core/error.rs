use thiserror::Error;
use std::io;

/// 下载错误
///
/// 需要 `Clone`：同一个终态结果会广播给所有等待者和订阅者。
/// 重复的 key 不是错误，第二次请求直接返回已有任务。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("传输失败: {0}")]
    TransferFailed(String),

    #[error("下载被取消")]
    Cancelled,

    #[error("描述文件损坏: {0}")]
    DescriptorCorrupt(String),

    #[error("任务不存在: {0}")]
    MissingKey(String),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("无效的文件名: {0}")]
    InvalidFileName(String),

    #[error("IO错误: {0}")]
    IoError(String),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("Actor 邮箱错误: {0}")]
    Mailbox(String),

    #[error("任务在结束前被丢弃")]
    TaskAborted,

    #[error("配置错误: {0}")]
    Config(String),
}

impl DownloadError {
    /// 来自传输层的错误只会出现在对应任务的完成通道里
    pub fn is_transfer_error(&self) -> bool {
        matches!(
            self,
            DownloadError::TransferFailed(_)
                | DownloadError::Cancelled
                | DownloadError::NetworkError(_)
                | DownloadError::ServerError(_)
        )
    }

    /// 调用方用法错误（例如查询从未注册过的 key、传入非法文件名）
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            DownloadError::MissingKey(_) | DownloadError::InvalidUrl(_) | DownloadError::InvalidFileName(_)
        )
    }

    pub fn missing_key<K: std::fmt::Debug>(key: &K) -> Self {
        DownloadError::MissingKey(format!("{:?}", key))
    }
}

impl From<io::Error> for DownloadError {
    fn from(error: io::Error) -> Self {
        DownloadError::IoError(error.to_string())
    }
}

impl From<actix::MailboxError> for DownloadError {
    fn from(error: actix::MailboxError) -> Self {
        DownloadError::Mailbox(error.to_string())
    }
}

impl From<url::ParseError> for DownloadError {
    fn from(error: url::ParseError) -> Self {
        DownloadError::InvalidUrl(error.to_string())
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(error: serde_json::Error) -> Self {
        DownloadError::DescriptorCorrupt(error.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
