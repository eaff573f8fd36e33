// src/sync/mod.rs

pub mod channel;
pub mod poller;
pub mod wire;

use crate::model::ad::CampaignPayload;

/// 载荷来自哪条同步通路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOrigin {
    /// 推送通道（设备已在播，后台换播放列表）
    Push,
    /// 启动时的 HTTP 拉取（前台阻塞缓存）
    Pull,
}

/// 同步通路写给编排器的事件，两条通路共用同一个队列，
/// 先到先赢，后到的完整覆盖前者
#[derive(Debug)]
pub enum SyncEvent {
    Payload {
        payload: CampaignPayload,
        origin: SyncOrigin,
    },
    /// 拉取失败了一轮，编排器视情况启用本地快照兜底
    PullFailed,
}
