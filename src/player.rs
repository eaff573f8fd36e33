// src/player.rs

use crate::cache::manager::{CacheManager, CacheMode};
use crate::error::Result;
use crate::model::ad::{Ad, CampaignPayload, PersistedSnapshot};
use crate::model::store::PlayerStore;
use crate::render::Renderer;
use crate::storage::kv_store::KvStore;
use crate::sync::{SyncEvent, SyncOrigin};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};

/// 同一份载荷摄取失败后的固定重试间隔
pub const INGEST_RETRY_DELAY: Duration = Duration::from_secs(2);

const SNAPSHOT_KEY: &str = "cache-ads";

/// 编排器：同步载荷的唯一消费者
///
/// 推送和拉取两条通路都写同一个队列，摄取按到达顺序整体替换，
/// 双投也是幂等的（已有文件不会重复下载，store 整体覆盖）。
/// 本地快照兜底是显式的会话状态，每次启动最多用一次。
pub struct Player {
    store: Arc<PlayerStore>,
    cache: CacheManager,
    kv: Arc<KvStore>,
    renderer: Arc<dyn Renderer>,
    force_refresh_first: bool,
    first_ingest_done: bool,
    used_local_fallback: bool,
}

impl Player {
    pub fn new(
        store: Arc<PlayerStore>,
        cache: CacheManager,
        kv: Arc<KvStore>,
        renderer: Arc<dyn Renderer>,
        force_refresh_first: bool,
    ) -> Self {
        Self {
            store,
            cache,
            kv,
            renderer,
            force_refresh_first,
            first_ingest_done: false,
            used_local_fallback: false,
        }
    }

    /// 摄取循环，队列关闭时返回
    pub async fn run(mut self, mut rx: mpsc::Receiver<SyncEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::Payload { payload, origin } => {
                    self.ingest_with_retry(payload, origin, &mut rx).await;
                }
                SyncEvent::PullFailed => self.try_local_fallback(),
            }
        }
        info!("sync queue closed, ingestion loop exiting");
    }

    /// 失败就原样重试同一份载荷；重试间隙若有更新的载荷到队列里，
    /// 后到者整体取代失败中的这份
    async fn ingest_with_retry(
        &mut self,
        mut payload: CampaignPayload,
        mut origin: SyncOrigin,
        rx: &mut mpsc::Receiver<SyncEvent>,
    ) {
        loop {
            match self.ingest(&payload, origin).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        "ingestion failed, retrying in {:?}: {}",
                        INGEST_RETRY_DELAY, e
                    );
                    sleep(INGEST_RETRY_DELAY).await;
                    while let Ok(event) = rx.try_recv() {
                        if let SyncEvent::Payload { payload: newer, origin: newer_origin } = event {
                            info!("newer payload supersedes the failing one");
                            payload = newer;
                            origin = newer_origin;
                        }
                    }
                }
            }
        }
    }

    /// 单次摄取：抽媒体地址 -> 缓存 -> 原子替换 -> 持久化快照
    async fn ingest(&mut self, payload: &CampaignPayload, origin: SyncOrigin) -> Result<()> {
        let ads = payload.campaigns().to_vec();
        let urls: Vec<String> = ads.iter().map(|ad| ad.ad_url.clone()).collect();

        let mode = if self.force_refresh_first && !self.first_ingest_done {
            CacheMode::ForceRefresh
        } else {
            CacheMode::CheckExisting
        };

        // 拉取（首次加载）阻塞式缓存；推送时设备还在播旧列表，走后台缓存
        let paths = match origin {
            SyncOrigin::Pull => {
                self.renderer.set_loading(true);
                let result = self.cache.ensure_cached(&urls, mode).await;
                self.renderer.set_loading(false);
                result?
            }
            SyncOrigin::Push => {
                self.renderer.set_background_loading(true);
                let result = self.cache.ensure_cached(&urls, mode).await;
                self.renderer.set_background_loading(false);
                result?
            }
        };

        let ads: Vec<Ad> = ads
            .into_iter()
            .zip(paths)
            .map(|(mut ad, path)| {
                ad.remote_url = Some(ad.ad_url.clone());
                ad.ad_url = path.display().to_string();
                ad
            })
            .collect();

        info!(
            origin = ?origin,
            campaigns = ads.len(),
            "playlist ingested, replacing active content"
        );
        self.store.replace(ads.clone(), payload.config.clone());
        self.kv.set(
            SNAPSHOT_KEY,
            &PersistedSnapshot {
                ads,
                screen: payload.config.clone(),
            },
        );
        self.first_ingest_done = true;
        Ok(())
    }

    /// 首次拉取一直失败时用上一次会话的快照兜底
    ///
    /// 快照里的媒体已经是本地路径，跳过缓存直接上屏；
    /// 每个会话最多替换一次，避免在陈旧数据和新数据之间来回抖动。
    fn try_local_fallback(&mut self) {
        if self.used_local_fallback || self.store.has_content() {
            return;
        }
        match self.kv.get::<PersistedSnapshot>(SNAPSHOT_KEY) {
            Some(snapshot) => {
                self.used_local_fallback = true;
                info!(
                    "fetch failed, using local snapshot ({} ads)",
                    snapshot.ads.len()
                );
                self.store.replace(snapshot.ads, snapshot.screen);
            }
            None => {
                info!("nothing in local storage, waiting for network");
            }
        }
    }
}
