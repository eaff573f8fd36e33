// src/model/store.rs

use crate::model::ad::{Ad, ScreenConfig};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// 当前生效的播放列表 + 屏幕配置的不可变快照
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub ads: Vec<Ad>,
    pub screen: ScreenConfig,
    pub version: u64,
}

/// 进程内唯一的播放数据存储
///
/// 同步管线是唯一写入方，整体替换（copy-on-write）；
/// 读取方拿到的 `Arc` 快照要么是旧值要么是完整的新值。
/// 版本号通过 watch 通道广播，调度器靠它感知数据更新。
pub struct PlayerStore {
    state: RwLock<Arc<PlayerState>>,
    version_tx: watch::Sender<u64>,
}

impl PlayerStore {
    pub fn new() -> Arc<Self> {
        let (version_tx, _) = watch::channel(0);
        Arc::new(Self {
            state: RwLock::new(Arc::new(PlayerState::default())),
            version_tx,
        })
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<PlayerState> {
        self.state
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_default()
    }

    /// 整体替换广告集合与屏幕配置，并广播新版本号
    pub fn replace(&self, ads: Vec<Ad>, screen: ScreenConfig) {
        let version = *self.version_tx.borrow() + 1;
        if let Ok(mut guard) = self.state.write() {
            *guard = Arc::new(PlayerState { ads, screen, version });
        }
        let _ = self.version_tx.send(version);
    }

    /// 订阅版本号变化
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    /// 是否已经有同步成功的数据
    pub fn has_content(&self) -> bool {
        self.snapshot().version > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad::{AdConfiguration, AdType};
    use chrono::Utc;

    fn ad(id: &str) -> Ad {
        Ad {
            ad_id: id.to_string(),
            ad_account_id: "a".to_string(),
            campaign_id: "c".to_string(),
            ad_type: AdType::Image,
            ad_url: "http://cdn.local/x.jpg".to_string(),
            remote_url: None,
            upload_ref: "r".to_string(),
            upload_name: String::new(),
            campaign_view: 1,
            ad_configuration: AdConfiguration {
                days: vec![],
                start_time: Utc::now(),
                end_time: Utc::now(),
                duration: 5,
            },
        }
    }

    #[test]
    fn replace_is_wholesale_and_bumps_version() {
        let store = PlayerStore::new();
        assert!(!store.has_content());

        let old = store.snapshot();
        store.replace(vec![ad("1"), ad("2")], ScreenConfig::default());

        // 旧快照不受影响，新快照是完整的新值
        assert_eq!(old.version, 0);
        assert!(old.ads.is_empty());
        let fresh = store.snapshot();
        assert_eq!(fresh.version, 1);
        assert_eq!(fresh.ads.len(), 2);

        store.replace(vec![ad("3")], ScreenConfig::default());
        assert_eq!(store.snapshot().ads.len(), 1);
        assert_eq!(store.snapshot().version, 2);
    }

    #[tokio::test]
    async fn subscribers_see_version_changes() {
        let store = PlayerStore::new();
        let mut rx = store.subscribe();
        store.replace(vec![], ScreenConfig::default());
        rx.changed().await.expect("watch alive");
        assert_eq!(*rx.borrow(), 1);
    }
}
