use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn engine_log_path(log_root: &Path) -> PathBuf {
    log_root.join("logs/engine.log")
}

pub fn append_engine_log_line(log_root: &Path, line: &str) -> std::io::Result<()> {
    let path = engine_log_path(log_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{line}")
}

/// Engine decision log. Without a configured root every append is a no-op,
/// which keeps the orchestrator free of filesystem requirements in tests and
/// embedded callers.
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    log_root: Option<PathBuf>,
}

impl EngineLog {
    pub fn new(log_root: Option<PathBuf>) -> Self {
        Self { log_root }
    }

    pub fn append(&self, now: i64, message: impl AsRef<str>) -> std::io::Result<()> {
        let Some(root) = self.log_root.as_deref() else {
            return Ok(());
        };
        let line = format!("ts={now} {}", message.as_ref());
        append_engine_log_line(root, &line)
    }
}
