// src/cache/manager.rs

use crate::error::{PlayerError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// 缓存模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// 本地已存在的文件直接复用，只下载缺失的
    CheckExisting,
    /// 先删除本地文件再重新下载
    ForceRefresh,
}

/// 内容缓存管理器：把远端媒体地址物化成本地文件
///
/// 下载严格串行，受限设备上避免带宽和磁盘的峰值压力。
/// 除 ForceRefresh 的删除外没有任何淘汰策略，播放列表由后端
/// 人工维护且规模很小。
pub struct CacheManager {
    client: Client,
    dir: PathBuf,
}

impl CacheManager {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::error!("failed to create media dir {:?}: {}", dir, e);
        }
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            dir,
        }
    }

    /// 确保每个 URL 都有对应的本地文件，返回与输入同序同长的本地路径
    ///
    /// 任何一个 URL 下载失败都让整批失败并返回该 URL 的 CacheError，
    /// 由调用方决定重试整批还是降级使用远端地址。
    pub async fn ensure_cached(&self, urls: &[String], mode: CacheMode) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(urls.len());

        for url in urls {
            let path = self.local_path(url)?;
            let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);

            match mode {
                CacheMode::CheckExisting if exists => {
                    debug!("cache hit: {}", url);
                    paths.push(path);
                    continue;
                }
                CacheMode::ForceRefresh if exists => {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        return Err(PlayerError::cache(url, format!("failed to evict: {}", e)));
                    }
                }
                _ => {}
            }

            self.download(url, &path).await?;
            paths.push(path);
        }

        Ok(paths)
    }

    /// 本地文件名取 URL 的最后一个路径段（去掉 query）
    fn local_path(&self, url: &str) -> Result<PathBuf> {
        let name = url
            .rsplit('/')
            .next()
            .and_then(|seg| seg.split('?').next())
            .unwrap_or("");
        if name.is_empty() {
            return Err(PlayerError::cache(url, "url has no file name segment"));
        }
        Ok(self.dir.join(name))
    }

    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        info!("downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PlayerError::cache(url, e))?;

        if !response.status().is_success() {
            return Err(PlayerError::cache(url, format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| PlayerError::cache(url, e))?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| PlayerError::cache(url, e))?;
        debug!("cached {} -> {:?} ({} bytes)", url, path, bytes.len());
        Ok(())
    }
}
