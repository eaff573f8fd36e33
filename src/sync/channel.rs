// src/sync/channel.rs

use crate::sync::wire::{InboundMessage, OutboundMessage};
use crate::sync::{SyncEvent, SyncOrigin};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// 断线后的固定重连间隔，不做指数退避，设备要无限自愈
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// 推送通道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// 与后端保持长连接的推送通道
///
/// 状态机：Disconnected -> Connecting -> Connected -> Disconnected 循环。
/// 入站消息派发进同步队列，出站队列（pong / device-log）由本任务独占
/// 写端。断线期间的出站消息直接丢弃并告警，遥测本来就是尽力而为。
pub struct SyncChannel {
    ws_url: String,
    device_code: String,
    sync_tx: mpsc::Sender<SyncEvent>,
    outbound_rx: mpsc::Receiver<OutboundMessage>,
    wake: Arc<Notify>,
    state: ChannelState,
}

impl SyncChannel {
    /// 创建通道任务本体，同时返回出站消息的发送端和提前重连的唤醒句柄
    pub fn new(
        ws_url: &str,
        device_code: &str,
        sync_tx: mpsc::Sender<SyncEvent>,
    ) -> (Self, mpsc::Sender<OutboundMessage>, Arc<Notify>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(256);
        let wake = Arc::new(Notify::new());
        let channel = Self {
            ws_url: ws_url.to_string(),
            device_code: device_code.to_string(),
            sync_tx,
            outbound_rx,
            wake: Arc::clone(&wake),
            state: ChannelState::Disconnected,
        };
        (channel, outbound_tx, wake)
    }

    fn set_state(&mut self, next: ChannelState) {
        if self.state != next {
            debug!("sync channel: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// 重连循环，永不返回
    pub async fn run(mut self) {
        let url = format!("{}?type=device&id={}", self.ws_url, self.device_code);
        loop {
            self.set_state(ChannelState::Connecting);
            match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    self.set_state(ChannelState::Connected);
                    info!("sync channel connected: {}", url);
                    self.serve(stream).await;
                }
                Err(e) => {
                    warn!("sync channel connect failed: {}", e);
                }
            }
            self.set_state(ChannelState::Disconnected);

            // 断线期间积压的出站消息不再有意义，丢弃
            while let Ok(msg) = self.outbound_rx.try_recv() {
                warn!("socket connection is lost, dropping outbound message: {:?}", msg);
            }

            tokio::select! {
                _ = sleep(RECONNECT_DELAY) => {}
                _ = self.wake.notified() => {
                    info!("network reachable again, reconnecting immediately");
                }
            }
        }
    }

    /// 已连接状态下的双向收发，连接断开时返回
    async fn serve<S>(&mut self, stream: tokio_tungstenite::WebSocketStream<S>)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut sink, mut inbound) = stream.split();
        let sync_tx = self.sync_tx.clone();
        let outbound_rx = &mut self.outbound_rx;

        loop {
            tokio::select! {
                msg = inbound.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = Self::dispatch(&sync_tx, text.as_str()).await {
                            let json = match serde_json::to_string(&reply) {
                                Ok(json) => json,
                                Err(e) => {
                                    warn!("failed to encode reply: {}", e);
                                    continue;
                                }
                            };
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("socket closed by peer, reconnecting in {:?}", RECONNECT_DELAY);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("socket error: {}", e);
                        return;
                    }
                },
                outbound = outbound_rx.recv() => {
                    let Some(outbound) = outbound else { return };
                    let json = match serde_json::to_string(&outbound) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("failed to encode outbound message: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// 按 `event` 字段派发一条入站消息，返回需要立即回写的应答
    async fn dispatch(
        sync_tx: &mpsc::Sender<SyncEvent>,
        text: &str,
    ) -> Option<OutboundMessage> {
        let mut raw = text.as_bytes().to_vec();
        let message = match simd_json::serde::from_slice::<InboundMessage>(&mut raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("unparseable channel message, ignoring: {}", e);
                return None;
            }
        };

        match message {
            InboundMessage::SendToDevice { data } => {
                info!("received playlist push ({} campaigns)", data.campaigns().len());
                let event = SyncEvent::Payload {
                    payload: data,
                    origin: SyncOrigin::Push,
                };
                if sync_tx.send(event).await.is_err() {
                    warn!("ingestion queue closed, dropping pushed playlist");
                }
                None
            }
            InboundMessage::Ping => Some(OutboundMessage::Pong),
        }
    }
}
