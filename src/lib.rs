//! multifetch: 按 key 去重、限制并发的下载管理器
//!
//! - [`core::DownloadManager`]: 任务注册表 + 并发准入
//! - [`core::SequentialQueue`]: 一次只下载一个、可暂停的顺序队列
//! - [`core::task::Transfer`]: 传输能力，生产实现为 [`core::task::HttpTransfer`]

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
