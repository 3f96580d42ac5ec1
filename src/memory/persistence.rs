//! 运行轨迹持久化
//!
//! 每次流水线运行结束后把 transcript 写成 `{"trace": {...}}` JSON 文件，
//! 供 mas-judge（LLM-as-judge）离线评估。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::memory::Message;

/// 单次运行的轨迹：observations 为完整 transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub id: String,
    pub created_at: String,
    pub query: String,
    pub observations: Vec<Message>,
    pub summary: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct TraceFile {
    trace: RunTrace,
}

/// 轨迹目录：每次运行一个 `<id>.json`
#[derive(Debug)]
pub struct TracePersistence {
    dir: PathBuf,
}

impl TracePersistence {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 写入一条轨迹；目录不存在时自动创建，返回写入的文件路径
    pub fn save(&self, trace: &RunTrace) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", trace.id));
        let file = TraceFile {
            trace: trace.clone(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        Ok(path)
    }

    /// 读取单个轨迹文件
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<RunTrace> {
        let data = std::fs::read_to_string(path)?;
        let file: TraceFile = serde_json::from_str(&data)?;
        Ok(file.trace)
    }
}
