// src/mock_backend.rs

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{serve, Json, Router};
use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::model::ad::demo_payload;
use crate::sync::wire::{InboundMessage, OutboundMessage};

/// mock 后端的共享状态
pub struct MockState {
    /// 设备端访问本服务的基础地址，demo 素材的 URL 用它拼出来
    pub base_url: String,
    /// 设备连上 ws 后多久推一份新播放列表
    pub push_delay: Duration,
}

/// 组装 mock 后端路由：campaign 拉取、demo 素材、设备推送通道
pub fn router(base_url: String, push_delay: Duration) -> Router {
    let state = Arc::new(MockState { base_url, push_delay });
    Router::new()
        .route("/v1/public-advert/campaigns/{code}", get(handle_campaigns))
        .route("/media/{name}", get(handle_media))
        .route("/ws", get(handle_ws_upgrade))
        .with_state(state)
}

/// 模拟 campaign 拉取接口，返回随机生成的演示载荷
async fn handle_campaigns(
    Path(code): Path<String>,
    State(state): State<Arc<MockState>>,
) -> impl IntoResponse {
    info!("mock backend: campaign fetch from device {}", code);

    // 模拟后端处理延迟（100 ~ 300 毫秒）
    let delay_ms = rand::thread_rng().gen_range(100..300);
    sleep(Duration::from_millis(delay_ms)).await;

    Json(demo_payload(&state.base_url, &code))
}

/// demo 素材：内容只和文件名相关，缓存端只关心字节落盘
async fn handle_media(Path(name): Path<String>) -> impl IntoResponse {
    if name.ends_with(".html") {
        format!("<html><body>mock widget: {}</body></html>", name).into_bytes()
    } else {
        format!("mock-media:{}", name).into_bytes()
    }
}

async fn handle_ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<MockState>>,
) -> impl IntoResponse {
    let device = params.get("id").cloned().unwrap_or_default();
    info!("mock backend: device socket connected ({})", device);
    ws.on_upgrade(move |socket| handle_device_socket(socket, device, state))
}

/// 设备长连接：到点推一份新列表，周期 ping，回收设备的 pong 和遥测
async fn handle_device_socket(socket: WebSocket, device: String, state: Arc<MockState>) {
    let (mut sink, mut stream) = socket.split();
    let push_timer = sleep(state.push_delay);
    tokio::pin!(push_timer);
    let mut pushed = false;
    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            _ = &mut push_timer, if !pushed => {
                pushed = true;
                let message = InboundMessage::SendToDevice {
                    data: demo_payload(&state.base_url, &device),
                };
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("mock backend: failed to encode push: {}", e);
                        continue;
                    }
                };
                info!("mock backend: pushing fresh playlist to {}", device);
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            _ = ping_interval.tick() => {
                let json = match serde_json::to_string(&InboundMessage::Ping) {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<OutboundMessage>(text.as_str()) {
                        Ok(OutboundMessage::Pong) => {
                            info!("mock backend: pong from {}", device);
                        }
                        Ok(OutboundMessage::DeviceLog { logs }) => {
                            info!(
                                device = %device,
                                ad_id = %logs.ad_id,
                                message_type = ?logs.message_type,
                                logged_on = %logs.logged_on,
                                "mock backend: device log"
                            );
                        }
                        Err(e) => {
                            warn!("mock backend: unparseable device message: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("mock backend: device socket closed ({})", device);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("mock backend: socket error: {}", e);
                    return;
                }
            },
        }
    }
}

/// 启动 mock 后端
/// 服务监听指定端口，设备把 server/ws 地址指向它即可完整联调
pub async fn start_mock_backend(port: u16, push_delay: Duration) {
    let base_url = format!("http://127.0.0.1:{}", port);
    let app = router(base_url, push_delay);

    let addr = format!("0.0.0.0:{}", port);
    info!("mock backend running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await.expect("mock backend bind");
    let _ = serve(listener, app).await;
}
