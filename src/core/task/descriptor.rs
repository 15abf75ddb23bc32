//! `.fds` 描述文件：记录某个 (文件名, URL) 是否已经完整下载过
//!
//! 这是尽力而为的本地缓存，不是事务：文件写完到描述文件更新之间崩溃，
//! 下次启动会重新下载。

use log::{debug, warn};
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::core::error::DownloadError;

/// 描述文件扩展名
pub const DESCRIPTOR_EXTENSION: &str = "fds";

/// 持久化的描述信息；字段名与旧版程序写出的 JSON 保持一致
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FileDescriptor {
    pub file_name: String,
    pub url: String,
    pub download_completed: bool,
}

impl FileDescriptor {
    pub fn fresh(file_name: &str, url: &Url) -> Self {
        Self {
            file_name: file_name.to_string(),
            url: url.to_string(),
            download_completed: false,
        }
    }

    pub fn matches(&self, file_name: &str, url: &Url) -> bool {
        self.file_name == file_name && self.url == url.as_str()
    }
}

/// 描述文件存储
pub trait DescriptorStore: Send + Sync + 'static {
    /// `Ok(None)` 表示不存在，解析失败返回 `DescriptorCorrupt`
    fn read(&self, path: &Path) -> Result<Option<FileDescriptor>, DownloadError>;
    fn write(&self, path: &Path, descriptor: &FileDescriptor) -> Result<(), DownloadError>;
}

/// 目标文件对应的描述文件路径：`<目标文件>.fds`
pub fn descriptor_path(file: &Path) -> PathBuf {
    let mut path = file.as_os_str().to_owned();
    path.push(".");
    path.push(DESCRIPTOR_EXTENSION);
    PathBuf::from(path)
}

/// 本地文件系统上的 JSON 描述文件
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDescriptorStore;

impl DescriptorStore for JsonDescriptorStore {
    fn read(&self, path: &Path) -> Result<Option<FileDescriptor>, DownloadError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let descriptor = serde_json::from_str(&content)?;
        Ok(Some(descriptor))
    }

    fn write(&self, path: &Path, descriptor: &FileDescriptor) -> Result<(), DownloadError> {
        let json = serde_json::to_string(descriptor)
            .map_err(|e| DownloadError::IoError(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// 单个任务持有的描述文件
pub struct DescriptorSlot {
    store: Arc<dyn DescriptorStore>,
    path: PathBuf,
    descriptor: FileDescriptor,
}

impl DescriptorSlot {
    /// 任务构造时调用：
    /// - 不存在、损坏或 (文件名, URL) 不匹配时重写一份 `download_completed = false` 的新描述
    /// - 匹配时沿用已有描述
    pub fn open(store: Arc<dyn DescriptorStore>, file: &Path, url: &Url) -> Self {
        let path = descriptor_path(file);
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let existing = match store.read(&path) {
            Ok(existing) => existing,
            Err(e) => {
                warn!("描述文件 {} 无法使用，将重建: {}", path.display(), e);
                None
            }
        };

        let mut slot = match existing {
            Some(descriptor) if descriptor.matches(&file_name, url) => {
                debug!("沿用描述文件 {} (已完成: {})", path.display(), descriptor.download_completed);
                return Self { store, path, descriptor };
            }
            Some(_) => {
                debug!("描述文件 {} 与请求不匹配，重新下载", path.display());
                Self { store, path, descriptor: FileDescriptor::fresh(&file_name, url) }
            }
            None => Self { store, path, descriptor: FileDescriptor::fresh(&file_name, url) },
        };
        slot.save();
        slot
    }

    pub fn is_completed(&self) -> bool {
        self.descriptor.download_completed
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.descriptor
    }

    /// 记录新的完成状态并重写描述文件
    pub fn record(&mut self, completed: bool) {
        self.descriptor.download_completed = completed;
        self.save();
    }

    fn save(&mut self) {
        if let Err(e) = self.store.write(&self.path, &self.descriptor) {
            warn!("写入描述文件 {} 失败: {}", self.path.display(), e);
        }
    }
}
