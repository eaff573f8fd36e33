// src/storage/kv_store.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// 文件级持久化 KV 存储
///
/// 每个 key 对应数据目录下的一个 JSON 文件，启动时按需读取。
/// 读写失败一律记日志并按"没有缓存值"处理，不向调用方传播，
/// 设备在仅内存状态下也要能继续运行。
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = fs::create_dir_all(&dir) {
            error!("failed to create data dir {:?}: {}", dir, e);
        }
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// 读取 key；文件不存在、读失败或 JSON 损坏都返回 None
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                error!("failed to read {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("corrupt entry for key '{}', ignoring: {}", key, e);
                None
            }
        }
    }

    /// 写入 key，返回是否落盘成功
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let path = self.path_for(key);
        let content = match serde_json::to_string(value) {
            Ok(content) => content,
            Err(e) => {
                error!("failed to serialize value for key '{}': {}", key, e);
                return false;
            }
        };
        match fs::write(&path, content) {
            Ok(()) => true,
            Err(e) => {
                error!("failed to write {:?}: {}", path, e);
                false
            }
        }
    }
}
