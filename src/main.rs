// src/main.rs

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use rust_signage::cache::manager::CacheManager;
use rust_signage::device::identity;
use rust_signage::logging::event_logger::EventLogger;
use rust_signage::mock_backend;
use rust_signage::model::store::PlayerStore;
use rust_signage::player::Player;
use rust_signage::render::{ConsoleRenderer, Renderer};
use rust_signage::sched::scheduler::Scheduler;
use rust_signage::storage::kv_store::KvStore;
use rust_signage::sync::channel::SyncChannel;
use rust_signage::sync::poller::Poller;

#[derive(Parser, Debug)]
#[command(version = "1.0", about = "A digital-signage device player")]
struct CliArgs {
    /// 后端 HTTP 地址（campaign 拉取）
    #[arg(long, default_value = "https://cjtronics.tushcode.com")]
    server_url: String,
    /// 后端推送通道地址
    #[arg(long, default_value = "wss://cjtronics.tushcode.com/ws")]
    ws_url: String,
    /// 设备码、播放列表快照等持久化数据目录
    #[arg(long, default_value = "data")]
    data_dir: String,
    /// 缓存媒体文件目录
    #[arg(long, default_value = "data/media")]
    media_dir: String,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// 在本地起一个 mock 后端并把两个同步地址都指过去（演示/联调）
    #[arg(long, default_value_t = false)]
    mock: bool,
    #[arg(long, default_value_t = 9005)]
    mock_port: u16,
    /// 首次前台缓存无视本地文件强制重新下载
    #[arg(long, default_value_t = false)]
    force_refresh: bool,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志：控制台 + 按小时滚动的 JSON 文件
    let log_file = rolling::hourly(&args.log_dir, "signage_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set global tracing subscriber");

    // --mock 时先拉起 mock 后端，设备连上 15 秒后它会推一份新列表
    let (server_url, ws_url) = if args.mock {
        let port = args.mock_port;
        tokio::spawn(async move {
            mock_backend::start_mock_backend(port, Duration::from_secs(15)).await;
        });
        (
            format!("http://127.0.0.1:{}", port),
            format!("ws://127.0.0.1:{}/ws", port),
        )
    } else {
        (args.server_url.clone(), args.ws_url.clone())
    };

    // 设备身份：持久化的 6 位设备码
    let kv = Arc::new(KvStore::open(&args.data_dir));
    let device_code = identity::get_or_create(&kv);
    info!(
        "device code: {} (enter it at https://cjtronicsbyfolham.com to pair this device)",
        device_code
    );

    let store = PlayerStore::new();
    let renderer: Arc<dyn Renderer> = Arc::new(ConsoleRenderer);

    // 同步队列：推送通道和启动拉取都写这里，编排器是唯一消费者
    let (sync_tx, sync_rx) = mpsc::channel(16);

    let (channel, outbound_tx, channel_wake) =
        SyncChannel::new(&ws_url, &device_code, sync_tx.clone());
    tokio::spawn(channel.run());

    let poller = Poller::new(&server_url, &device_code, sync_tx, channel_wake);
    tokio::spawn(poller.run());

    let player = Player::new(
        Arc::clone(&store),
        CacheManager::new(&args.media_dir),
        Arc::clone(&kv),
        Arc::clone(&renderer),
        args.force_refresh,
    );
    tokio::spawn(player.run(sync_rx));

    let logger = EventLogger::new(&device_code, outbound_tx);
    let scheduler = Scheduler::new(store, renderer, logger);
    tokio::spawn(scheduler.run());

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutting down gracefully...");
        }
    }
    info!("signage player shut down.");
}
