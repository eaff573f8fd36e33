// src/sync/poller.rs

use crate::error::{PlayerError, Result};
use crate::model::ad::CampaignPayload;
use crate::sync::{SyncEvent, SyncOrigin};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tracing::{info, warn};

/// 拉取失败后的固定重试间隔
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// 启动期的 HTTP 拉取通路
///
/// 覆盖推送通道还没送来数据的窗口期：启动后立即拉一次，
/// 失败就每 10 秒重试，成功一次后退出，后续周期全部交给推送通道。
pub struct Poller {
    client: Client,
    server_url: String,
    device_code: String,
    sync_tx: mpsc::Sender<SyncEvent>,
    channel_wake: Arc<Notify>,
}

impl Poller {
    pub fn new(
        server_url: &str,
        device_code: &str,
        sync_tx: mpsc::Sender<SyncEvent>,
        channel_wake: Arc<Notify>,
    ) -> Self {
        Self {
            client: Client::new(),
            server_url: server_url.to_string(),
            device_code: device_code.to_string(),
            sync_tx,
            channel_wake,
        }
    }

    pub async fn run(self) {
        loop {
            match self.fetch_once().await {
                Ok(payload) => {
                    info!("campaign fetch ok ({} campaigns)", payload.campaigns().len());
                    // 网络明显可达，顺手催推送通道提前重连
                    self.channel_wake.notify_one();
                    let event = SyncEvent::Payload {
                        payload,
                        origin: SyncOrigin::Pull,
                    };
                    if self.sync_tx.send(event).await.is_err() {
                        warn!("ingestion queue closed, poller exiting");
                    }
                    return;
                }
                Err(e) => {
                    warn!("campaign fetch failed, retrying in {:?}: {}", RETRY_DELAY, e);
                    let _ = self.sync_tx.send(SyncEvent::PullFailed).await;
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<CampaignPayload> {
        let url = format!(
            "{}/v1/public-advert/campaigns/{}",
            self.server_url, self.device_code
        );
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let mut raw = bytes.to_vec();
        simd_json::serde::from_slice::<CampaignPayload>(&mut raw)
            .map_err(|e| PlayerError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad::demo_payload;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    async fn spawn_backend(fail: bool) -> String {
        let app = if fail {
            Router::new().route(
                "/v1/public-advert/campaigns/{code}",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
        } else {
            Router::new().route(
                "/v1/public-advert/campaigns/{code}",
                get(|| async { Json(demo_payload("http://127.0.0.1:1", "TEST01")) }),
            )
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn successful_fetch_delivers_pull_payload_and_wakes_channel() {
        let base = spawn_backend(false).await;
        let (tx, mut rx) = mpsc::channel(4);
        let wake = Arc::new(Notify::new());
        let waked = Arc::clone(&wake);

        Poller::new(&base, "TEST01", tx, wake).run().await;

        match rx.recv().await.expect("event") {
            SyncEvent::Payload { payload, origin } => {
                assert_eq!(origin, SyncOrigin::Pull);
                assert!(!payload.campaigns().is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // notify_one 已经置位，notified() 立即返回
        tokio::time::timeout(Duration::from_secs(1), waked.notified())
            .await
            .expect("wake was signalled");
    }

    #[tokio::test]
    async fn non_2xx_is_a_failure() {
        let base = spawn_backend(true).await;
        let (tx, _rx) = mpsc::channel(4);
        let poller = Poller::new(&base, "TEST01", tx, Arc::new(Notify::new()));
        assert!(poller.fetch_once().await.is_err());
    }
}
