// src/sync/wire.rs

use crate::model::ad::CampaignPayload;
use serde::{Deserialize, Serialize};

/// 推送通道入站消息，按 `event` 字段区分
///
/// mock 后端也要构造这些消息，所以两个方向都同时派生序列化与反序列化。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum InboundMessage {
    /// 后端下发新的播放列表 + 屏幕配置
    SendToDevice { data: CampaignPayload },
    /// 保活探测，设备需立即回 pong
    Ping,
}

/// 推送通道出站消息
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OutboundMessage {
    Pong,
    DeviceLog { logs: DeviceLog },
}

/// 播放 / 跳过遥测日志，即发即弃，从不持久化
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLog {
    pub device_id: String,
    pub ad_id: String,
    pub account_id: String,
    pub campaign_id: String,
    pub message_type: MessageType,
    pub logged_on: String,
    pub upload_ref: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Play,
    Skipped,
}
