use async_trait::async_trait;
use awc::http::header;
use awc::{Client, Connector};
use futures::StreamExt;
use log::debug;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator::is_valid_url;
use super::transfer::{CancelFlag, ProgressReporter, Transfer, TransferOutcome};

/// 基于 awc 的单连接 HTTP 传输
///
/// 超时只作用于建立连接；响应体按流写入，大文件不会被整体超时打断。
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    timeout: Duration,
    user_agent: String,
}

impl HttpTransfer {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self { timeout, user_agent: user_agent.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_secs(config.timeout), config.user_agent.clone())
    }

    fn client(&self) -> Client {
        Client::builder()
            .connector(Connector::new().timeout(self.timeout))
            .disable_timeout()
            .add_default_header((header::USER_AGENT, self.user_agent.clone()))
            .finish()
    }

    /// 返回 `Ok(false)` 表示被取消
    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        progress: &ProgressReporter,
        cancel: &CancelFlag,
    ) -> Result<bool, DownloadError> {
        if !is_valid_url(url.as_str()) {
            return Err(DownloadError::InvalidUrl(url.to_string()));
        }

        let client = self.client();
        let mut response = client.get(url.as_str()).send().await
            .map_err(|e| DownloadError::NetworkError(format!("{:?}", e)))?;

        if !response.status().is_success() {
            return Err(DownloadError::ServerError(format!("服务器错误: {}", response.status())));
        }

        let total = response.headers().get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        debug!("{} 内容长度: {}", url, total);

        let mut file = tokio::fs::File::create(destination).await?;
        let mut downloaded = 0u64;
        let mut last_percent = 0u8;

        loop {
            let chunk = tokio::select! {
                chunk = response.next() => chunk,
                _ = cancel.cancelled() => return Ok(false),
            };
            let Some(chunk) = chunk else { break };
            let bytes = chunk.map_err(|e| DownloadError::NetworkError(format!("网络流错误: {:?}", e)))?;

            file.write_all(&bytes).await?;
            downloaded += bytes.len() as u64;

            if total > 0 {
                let percent = (downloaded.saturating_mul(100) / total).min(100) as u8;
                if percent > last_percent {
                    progress.report(percent);
                    last_percent = percent;
                }
            }
        }
        file.flush().await?;

        if total > 0 && downloaded < total {
            return Err(DownloadError::TransferFailed(format!(
                "文件大小不匹配: 预期 {} 字节, 实际 {} 字节",
                total, downloaded
            )));
        }
        Ok(true)
    }
}

#[async_trait(?Send)]
impl Transfer for HttpTransfer {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressReporter,
        cancel: CancelFlag,
    ) -> TransferOutcome {
        match self.download(url, destination, &progress, &cancel).await {
            Ok(true) => TransferOutcome::Success,
            Ok(false) => TransferOutcome::Cancelled,
            Err(e) => TransferOutcome::Failure(e.to_string()),
        }
    }
}
