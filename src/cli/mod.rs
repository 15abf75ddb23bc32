//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的命令
//!
//! - 基本下载：`multifetch <url>...`
//! - 批量下载：`multifetch -f urls.txt`
//! - 顺序下载：`multifetch --sequential <url>...`
//! - 编辑配置：`multifetch -e`
//! - 指定配置：`multifetch -c config.conf <url>`
//!
//! ## 平台支持
//!
//! - Windows: `%APPDATA%/multifetch/multifetch.conf`
//! - macOS: `~/Library/Application Support/multifetch/multifetch.conf`
//! - Linux: `~/.config/multifetch/multifetch.conf`

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;
use crate::config::Config;
use crate::core::error::DownloadError;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/multifetch/multifetch.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/multifetch/multifetch.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/multifetch/multifetch.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// multifetch 命令行参数
///
/// 示例用法：
///   multifetch https://example.com/file.zip
///   multifetch -j 5 -f urls.txt
///   multifetch --sequential https://example.com/a.zip https://example.com/b.zip
#[derive(Parser, Debug, Clone)]
#[command(
    name = "multifetch",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "按 URL 去重、限制并发的下载管理器",
    long_about = "同时下载多个文件，超过并发上限的任务按先后顺序排队；已下载完成的文件会被跳过。\n\n运行时按键：p 暂停/继续（顺序模式）  c 取消全部并删除文件  q 退出\n\n示例：\n  multifetch https://example.com/file.zip\n  multifetch -j 5 -f urls.txt\n  multifetch --sequential https://example.com/a.zip https://example.com/b.zip\n"
)]
pub struct Args {
    /// 要下载的URL列表（可同时指定多个）
    #[arg(required = false, help = "要下载的URL列表，可以同时指定多个URL。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL，# 开头为注释。")]
    pub file: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 指定下载目录
    #[arg(long, short = 'd', help = "指定下载目录，覆盖配置文件中的设置。")]
    pub download_dir: Option<String>,

    /// 最大并发下载数
    #[arg(long, short = 'j', help = "同时进行的下载数，覆盖配置文件中的设置。")]
    pub jobs: Option<isize>,

    /// 顺序下载
    #[arg(long, help = "一次只下载一个文件，可以用 p 键暂停/继续。")]
    pub sequential: bool,

    /// 输出调试日志
    #[arg(short, long, help = "输出调试日志。")]
    pub verbose: bool,
}

impl Args {
    /// 解析命令行参数，加载并合并配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        if args.edit_config {
            // 先确保文件存在再打开
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 加载配置文件（不存在时创建），再用命令行参数覆盖
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)
            .map_err(|e| DownloadError::Config(format!("无法读取配置文件 {}: {}", self.config, e)))?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    /// 命令行和文件中的 URL，保持出现顺序
    pub fn get_urls(&self) -> Result<Vec<String>, DownloadError> {
        let mut urls = Vec::new();
        urls.extend_from_slice(&self.urls);

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::Config(format!("URL文件不存在: {}", file_path)));
            }
            let content = fs::read_to_string(file_path)?;

            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(line.to_string());
                }
            }
        }

        if let Some(invalid) = urls.iter().find(|url| !crate::utils::validator::is_valid_url(url)) {
            return Err(DownloadError::InvalidUrl(invalid.clone()));
        }

        if urls.is_empty() {
            return Err(DownloadError::Config(
                "未提供任何URL。请通过命令行参数或文件提供至少一个URL。".to_string(),
            ));
        }

        Ok(urls)
    }
}
