use chrono::Local;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::core::error::DownloadError;

/// 只支持 HTTP(S)
pub fn is_valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 解析并校验下载地址
pub fn parse_url(url: &str) -> Result<Url, DownloadError> {
    if !is_valid_url(url) {
        return Err(DownloadError::InvalidUrl(url.to_string()));
    }
    Ok(Url::parse(url)?)
}

/// 文件名只能是下载目录下的单个路径分量
pub fn validate_file_name(name: &str) -> Result<(), DownloadError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DownloadError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap())
}

/// 把任意字符串清理成可用的文件名
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = unsafe_chars().replace_all(name, "_");
    cleaned.trim().trim_matches('.').to_string()
}

/// 从 URL 路径的最后一段推导文件名，推导不出时用 `download_<时间戳>`
pub fn file_name_from_url(url: &Url) -> String {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| {
            let decoded = percent_decode(segment);
            sanitize_file_name(&decoded)
        })
        .filter(|name| validate_file_name(name).is_ok());

    last_segment.unwrap_or_else(|| format!("download_{}", Local::now().format("%Y%m%d%H%M%S")))
}

/// URL 路径段里的 `%XX` 解码，不是合法 UTF-8 时原样返回
fn percent_decode(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
