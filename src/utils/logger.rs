use chrono::Local; // 用于获取本地时间
use env_logger::{Builder, Env, Target};
use log::LevelFilter; // 用于设置日志级别
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// 同时写 stderr 和日志文件
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// 打开（追加）日志文件，并确保目录存在
fn open_log_file(file_path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(file_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(file_path)
}

/// 日志级别：`-v` 为 debug，否则 warn；`RUST_LOG` 优先
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// 初始化全局日志
///
/// 多次调用时只有第一次生效。
pub fn init(level: LevelFilter, log_file: Option<&str>) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level.to_string()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = open_log_file(path)?;
        builder.target(Target::Pipe(Box::new(TeeWriter { file })));
    }

    // 已经初始化过时忽略
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), LevelFilter::Debug);
        assert_eq!(default_level(false), LevelFilter::Warn);
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");
        let mut file = open_log_file(path.to_str().unwrap()).unwrap();
        writeln!(file, "hello").unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("hello"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        assert!(init(LevelFilter::Warn, None).is_ok());
        assert!(init(LevelFilter::Debug, None).is_ok());
    }
}
