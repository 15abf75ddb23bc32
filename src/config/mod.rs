use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use log::warn;
use crate::core::error::DownloadError;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 默认下载目录
    pub download_dir: String,
    /// 最大并发下载数，0 或负数表示暂停准入
    pub max_concurrent_downloads: isize,
    /// 网络超时时间（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 是否写 `.fds` 描述文件，跳过已下载过的文件
    pub enable_resume: bool,
    /// 日志额外写入的文件
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
            max_concurrent_downloads: 3,
            timeout: 30,
            user_agent: format!("multifetch/{}", env!("CARGO_PKG_VERSION")),
            enable_resume: true,
            log_file: None,
        }
    }
}

impl Config {
    /// 加载配置文件；不存在时写出默认配置，格式错误时使用并重写默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    warn!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = Config::default();
                    config.save_with_tutorial(path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 配置文件开头的说明，全部是注释
    fn generate_tutorial_content() -> &'static str {
        r#"# multifetch 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# 配置文件位置：
# - Windows: %APPDATA%/multifetch/multifetch.conf
# - macOS: ~/Library/Application Support/multifetch/multifetch.conf
# - Linux: ~/.config/multifetch/multifetch.conf
#
# 配置项：
#
# download_dir              下载目录，支持相对路径和绝对路径
# max_concurrent_downloads  同时进行的下载数，建议 1-5；0 表示只排队不下载
# timeout                   建立连接的超时时间（秒）
# user_agent                某些服务器需要特定的 User-Agent
# enable_resume             在目标文件旁写 `<文件名>.fds`，记录是否已下载完成，
#                           再次运行时跳过已完成的文件
# log_file                  日志额外写入的文件，例如 log_file = "multifetch.log"
#
# 使用示例：
#   multifetch https://example.com/file.zip
#   multifetch -j 5 -f urls.txt
#   multifetch --sequential -d /path/to/downloads https://example.com/a.zip https://example.com/b.zip
#
# 运行时按键：p 暂停/继续（顺序模式）  c 取消全部并删除文件  q 退出
"#
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.download_dir.trim().is_empty() {
            return Err(DownloadError::Config("下载目录不能为空".to_string()));
        }
        if self.timeout == 0 {
            return Err(DownloadError::Config("超时时间必须大于0".to_string()));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(jobs) = args.jobs {
            self.max_concurrent_downloads = jobs;
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 并发数: {}\n\
            - 超时时间: {} 秒\n\
            - 断点记录: {}\n\
            - 日志文件: {}",
            self.download_dir,
            self.max_concurrent_downloads,
            self.timeout,
            if self.enable_resume { "启用" } else { "禁用" },
            self.log_file.as_deref().unwrap_or("无"),
        )
    }
}
