// src/logging/event_logger.rs

use crate::model::ad::Ad;
use crate::sync::wire::{DeviceLog, MessageType, OutboundMessage};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::warn;

/// 播放 / 跳过遥测发射器
///
/// 把事件编成 device-log 帧丢进推送通道的出站队列，即发即弃：
/// 队列满或通道已关闭只记一条 warn，不重试不落盘。
pub struct EventLogger {
    device_code: String,
    sender: Sender<OutboundMessage>,
}

impl EventLogger {
    pub fn new(device_code: &str, sender: Sender<OutboundMessage>) -> Arc<Self> {
        Arc::new(Self {
            device_code: device_code.to_string(),
            sender,
        })
    }

    pub fn play(&self, ad: &Ad) {
        self.send(ad, MessageType::Play);
    }

    pub fn skipped(&self, ad: &Ad) {
        self.send(ad, MessageType::Skipped);
    }

    fn send(&self, ad: &Ad, message_type: MessageType) {
        let frame = OutboundMessage::DeviceLog {
            logs: DeviceLog {
                device_id: self.device_code.clone(),
                ad_id: ad.ad_id.clone(),
                account_id: ad.ad_account_id.clone(),
                campaign_id: ad.campaign_id.clone(),
                message_type,
                logged_on: Utc::now().to_rfc3339(),
                upload_ref: ad.upload_ref.clone(),
            },
        };
        if let Err(e) = self.sender.try_send(frame) {
            warn!("log could not be sent: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad::{AdConfiguration, AdType};
    use tokio::sync::mpsc;

    fn ad() -> Ad {
        Ad {
            ad_id: "ad-1".to_string(),
            ad_account_id: "acct-1".to_string(),
            campaign_id: "cmp-1".to_string(),
            ad_type: AdType::Image,
            ad_url: "http://cdn.local/a.jpg".to_string(),
            remote_url: None,
            upload_ref: "up-1".to_string(),
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

    #[tokio::test]
    async fn play_and_skip_emit_device_log_frames() {
        let (tx, mut rx) = mpsc::channel(8);
        let logger = EventLogger::new("90J9R6", tx);

        logger.play(&ad());
        logger.skipped(&ad());

        for expected in [MessageType::Play, MessageType::Skipped] {
            match rx.recv().await.expect("frame") {
                OutboundMessage::DeviceLog { logs } => {
                    assert_eq!(logs.message_type, expected);
                    assert_eq!(logs.device_id, "90J9R6");
                    assert_eq!(logs.ad_id, "ad-1");
                }
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn closed_queue_drops_event_silently() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let logger = EventLogger::new("90J9R6", tx);
        // 不 panic、不阻塞即可
        logger.play(&ad());
    }
}
