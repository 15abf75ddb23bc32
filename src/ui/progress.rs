use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::error::DownloadError;
use crate::core::task::{DownloadHandle, TaskOutcome};

const BAR_TEMPLATE: &str = "{prefix:>24.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

// 结构体：ProgressManager
// 每个下载任务一条进度条，单位为百分比
pub struct ProgressManager {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        Self { multi: MultiProgress::new(), style }
    }

    /// 新增一条进度条
    pub fn add_bar(&self, label: &str) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(self.style.clone());
        bar.set_prefix(shorten(label, 24));
        bar.enable_steady_tick(Duration::from_millis(200));
        bar
    }

    /// 进度条之外输出一行，不会打乱进度条
    pub fn println(&self, line: &str) {
        let _ = self.multi.println(line);
    }

    /// 跟踪一个任务直到终态，返回任务结果
    pub async fn track(bar: ProgressBar, handle: DownloadHandle) -> TaskOutcome {
        bar.set_position(handle.progress() as u64);
        let mut progress = match handle.subscribe_progress().await {
            Ok(progress) => Some(progress),
            Err(_) => None,
        };

        let waiting = handle.wait();
        tokio::pin!(waiting);
        let outcome = loop {
            tokio::select! {
                outcome = &mut waiting => break outcome,
                Some(percent) = next_progress(&mut progress) => bar.set_position(percent as u64),
            }
        };

        match &outcome {
            Ok(_) => {
                bar.set_position(100);
                bar.finish_with_message("完成");
            }
            Err(DownloadError::Cancelled) => bar.abandon_with_message("已取消"),
            Err(e) => bar.abandon_with_message(format!("失败: {}", e)),
        }
        outcome
    }
}

async fn next_progress(progress: &mut Option<tokio::sync::mpsc::UnboundedReceiver<u8>>) -> Option<u8> {
    match progress {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// 截断过长的标签，保留结尾（通常是文件名）
fn shorten(label: &str, width: usize) -> String {
    let count = label.chars().count();
    if count <= width {
        return label.to_string();
    }
    let tail: String = label.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
