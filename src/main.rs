use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal,
};
use log::{info, warn};
use multifetch::cli;
use multifetch::config::Config;
use multifetch::core::error::DownloadError;
use multifetch::core::task::{DownloadHandle, HttpTransfer, TaskState, Transfer};
use multifetch::core::{DownloadManager, SequentialQueue};
use multifetch::ui::{print_error, DownloadSummary, ProgressManager};
use multifetch::utils::{logger, validator};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 键盘命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePause,
    CancelAll,
    Quit,
}

/// 并发模式用管理器，顺序模式用顺序队列
enum Frontend {
    Concurrent(DownloadManager<String>, isize),
    Sequential(SequentialQueue),
}

impl Frontend {
    fn new(config: &Config, sequential: bool) -> Result<Self> {
        let transfer: Arc<dyn Transfer> = Arc::new(HttpTransfer::from_config(config));
        Ok(if sequential {
            Frontend::Sequential(SequentialQueue::from_config(config, transfer)?)
        } else {
            Frontend::Concurrent(DownloadManager::from_config(config, transfer)?, config.max_concurrent_downloads)
        })
    }

    /// 提交期间不开始下载，避免前面的任务先结束就触发“全部结束”
    async fn hold(&self) -> Result<()> {
        if let Frontend::Concurrent(manager, _) = self {
            manager.set_ceiling(0).await?;
        }
        Ok(())
    }

    /// 所有任务结束时收到通知
    async fn finished(&self) -> Result<UnboundedReceiver<()>> {
        Ok(match self {
            Frontend::Concurrent(manager, _) => manager.subscribe_work_stopped().await?,
            Frontend::Sequential(queue) => queue.subscribe_drained().await?,
        })
    }

    async fn submit(&self, url: &str, file_name: &str) -> Result<DownloadHandle, DownloadError> {
        match self {
            Frontend::Concurrent(manager, _) => manager.request_download(url.to_string(), url, file_name).await,
            Frontend::Sequential(queue) => queue.enqueue_download(url, file_name).await,
        }
    }

    async fn run(&self) -> Result<()> {
        match self {
            Frontend::Concurrent(manager, ceiling) => manager.set_ceiling(*ceiling).await?,
            Frontend::Sequential(queue) => queue.start().await?,
        }
        Ok(())
    }

    /// 顺序模式下切换暂停；并发模式不支持暂停
    async fn toggle_pause(&self) -> Result<Option<bool>> {
        match self {
            Frontend::Concurrent(..) => Ok(None),
            Frontend::Sequential(queue) => {
                if queue.is_paused().await? {
                    queue.start().await?;
                    Ok(Some(false))
                } else {
                    queue.pause().await?;
                    Ok(Some(true))
                }
            }
        }
    }

    async fn cancel_all(&self, handles: &[DownloadHandle]) -> Result<()> {
        match self {
            Frontend::Concurrent(manager, _) => manager.delete_all().await?,
            Frontend::Sequential(queue) => {
                for handle in handles {
                    handle.cancel();
                }
                // 暂停中的队列也要把已取消的任务走完
                queue.start().await?;
            }
        }
        Ok(())
    }
}

#[actix::main]
async fn main() -> Result<()> {
    let (args, config) = cli::Args::parse_args()?;
    logger::init(logger::default_level(args.verbose), config.log_file.as_deref())?;
    info!("程序启动");

    let urls = args.get_urls()?;
    info!("解析到的URLs: {:?}", urls);
    info!("配置文件路径: {}", args.config);
    println!("{}", config.get_summary());

    let frontend = Frontend::new(&config, args.sequential)?;
    let mut finished = frontend.finished().await?;
    frontend.hold().await?;
    let progress = ProgressManager::new();

    let started = Instant::now();
    let handles = submit_all(&frontend, &progress, &urls).await;
    if handles.is_empty() {
        eprintln!("没有可下载的任务");
        return Ok(());
    }

    if args.sequential {
        println!("\n开始顺序下载... (按 'p' 暂停/继续, 'c' 取消全部, 'q' 退出)");
    } else {
        println!("\n开始下载... (按 'c' 取消全部, 'q' 退出)");
    }
    frontend.run().await?;

    run_download_loop(&frontend, &progress, &handles, &mut finished).await?;

    let summary = summarize(&handles, started.elapsed());
    info!(
        "下载结束 - 成功: {}, 失败: {}, 取消: {}",
        summary.success_count, summary.failed_count, summary.cancelled_count
    );
    println!("{}", summary);
    Ok(())
}

/// 为每个 URL 创建任务和进度条；URL 即任务 key
async fn submit_all(frontend: &Frontend, progress: &ProgressManager, urls: &[String]) -> Vec<DownloadHandle> {
    let mut seen = HashSet::new();
    let mut handles = Vec::new();

    for url in urls {
        if !seen.insert(url.as_str()) {
            warn!("重复的URL，已忽略: {}", url);
            continue;
        }
        let file_name = match validator::parse_url(url) {
            Ok(parsed) => validator::file_name_from_url(&parsed),
            Err(e) => {
                print_error(&format!("{} - {}", url, e));
                continue;
            }
        };

        match frontend.submit(url, &file_name).await {
            Ok(handle) => {
                info!("创建下载任务: {} -> {}", url, handle.file_path().display());
                let bar = progress.add_bar(&file_name);
                actix_rt::spawn(ProgressManager::track(bar, handle.clone()));
                handles.push(handle);
            }
            Err(e) => print_error(&format!("创建下载任务失败: {} - {}", url, e)),
        }
    }
    handles
}

/// 在阻塞线程里读取按键，直到 `stop` 被设置
fn read_keys(tx: UnboundedSender<Command>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        if let Ok(true) = event::poll(KEYBOARD_POLL_INTERVAL) {
            if let Ok(Event::Key(key_event)) = event::read() {
                let command = match key_event.code {
                    KeyCode::Char('p') | KeyCode::Char('P') => Command::TogglePause,
                    KeyCode::Char('c') | KeyCode::Char('C') => Command::CancelAll,
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Command::Quit,
                    _ => continue,
                };
                if tx.send(command).is_err() {
                    return;
                }
            }
        }
    }
}

/// 运行下载主循环：等待全部结束，期间处理按键
async fn run_download_loop(
    frontend: &Frontend,
    progress: &ProgressManager,
    handles: &[DownloadHandle],
    finished: &mut UnboundedReceiver<()>,
) -> Result<()> {
    // 不是终端时（例如输出被重定向）不读取按键
    let interactive = terminal::enable_raw_mode().is_ok();
    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    let key_reader = if interactive {
        let stop = stop.clone();
        Some(actix_rt::task::spawn_blocking(move || read_keys(key_tx, stop)))
    } else {
        drop(key_tx);
        None
    };

    let result = async {
        loop {
            tokio::select! {
                _ = finished.recv() => break,
                Some(command) = key_rx.recv() => match command {
                    Command::Quit => {
                        progress.println("用户退出");
                        info!("用户主动退出下载");
                        break;
                    }
                    Command::CancelAll => {
                        progress.println("正在取消所有下载任务...");
                        info!("用户取消所有下载任务");
                        frontend.cancel_all(handles).await?;
                    }
                    Command::TogglePause => match frontend.toggle_pause().await? {
                        Some(true) => progress.println("已暂停，当前文件下载完后不再开始新的下载"),
                        Some(false) => progress.println("已继续"),
                        None => progress.println("并发模式不支持暂停"),
                    },
                },
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    stop.store(true, Ordering::SeqCst);
    if let Some(reader) = key_reader {
        let _ = reader.await;
        terminal::disable_raw_mode()?;
    }
    result
}

fn summarize(handles: &[DownloadHandle], elapsed_time: Duration) -> DownloadSummary {
    let mut summary = DownloadSummary {
        total_files: handles.len(),
        elapsed_time,
        ..Default::default()
    };
    for handle in handles {
        let snapshot = handle.snapshot();
        match (snapshot.state, snapshot.error) {
            (TaskState::Completed, _) => summary.success_count += 1,
            (TaskState::Failed, Some(DownloadError::Cancelled)) => summary.cancelled_count += 1,
            (TaskState::Failed, _) => summary.failed_count += 1,
            _ => {}
        }
    }
    summary
}
