// src/sched/scheduler.rs

use crate::logging::event_logger::EventLogger;
use crate::model::ad::{classify, Ad, Classified, ScreenConfig};
use crate::model::layout;
use crate::model::store::PlayerStore;
use crate::render::Renderer;
use crate::sched::{admission, rotation};
use chrono::Local;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// widget 轮换的固定间隔，与广告的 per-item duration 无关
pub const WIDGET_INTERVAL: Duration = Duration::from_secs(5);

/// 空内容状态下重新评估可播性的间隔
pub const EMPTY_RECHECK: Duration = Duration::from_secs(30);

/// 整屏视图：广告轮播 / widget 补位屏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenView {
    Player,
    Widget,
}

/// 播放调度器
///
/// 消费 store 快照跑轮播；版本号一变就取消所有在途计时器，
/// 用新快照整屏重启。
pub struct Scheduler {
    store: Arc<PlayerStore>,
    renderer: Arc<dyn Renderer>,
    logger: Arc<EventLogger>,
}

impl Scheduler {
    pub fn new(
        store: Arc<PlayerStore>,
        renderer: Arc<dyn Renderer>,
        logger: Arc<EventLogger>,
    ) -> Self {
        Self { store, renderer, logger }
    }

    pub async fn run(self) {
        let mut version_rx = self.store.subscribe();
        loop {
            let snapshot = self.store.snapshot();
            if snapshot.version == 0 {
                // 还没有任何同步成功的数据，等第一份
                if version_rx.changed().await.is_err() {
                    return;
                }
                continue;
            }

            let classified = classify(&snapshot.ads);
            info!(
                version = snapshot.version,
                groups = classified.ad_groups.len(),
                widgets = classified.widgets.len(),
                "starting playback cycle"
            );

            let cancel = CancellationToken::new();
            tokio::select! {
                _ = self.play_cycle(&classified, &snapshot.screen, &cancel) => {
                    // play_cycle 自身永不返回
                }
                changed = version_rx.changed() => {
                    cancel.cancel();
                    if changed.is_err() {
                        return;
                    }
                    info!("playlist updated, restarting screens");
                }
            }
        }
    }

    /// 在一份固定的快照上无限轮转：广告屏 <-> widget 屏
    async fn play_cycle(
        &self,
        classified: &Classified,
        screen: &ScreenConfig,
        cancel: &CancellationToken,
    ) {
        let layout = layout::resolve(&screen.layout_reference);
        debug!(?layout, groups = classified.ad_groups.len(), "screen layout resolved");

        let mut view = ScreenView::Player;
        loop {
            let now = Local::now();
            let any_admissible = classified
                .ad_groups
                .iter()
                .flatten()
                .any(|ad| admission::admissible(ad, now));

            if !any_admissible && classified.widgets.is_empty() {
                // 终态：什么都播不了，亮占位屏，定期复查（窗口可能重新打开）
                self.renderer.show_empty();
                sleep(EMPTY_RECHECK).await;
                continue;
            }

            match view {
                ScreenView::Player => {
                    if any_admissible {
                        self.run_ad_screen(classified, cancel).await;
                    }
                    if !classified.widgets.is_empty() {
                        view = ScreenView::Widget;
                    }
                    // 没有 widget 时留在 Player，所有分组从 Selecting 重启
                }
                ScreenView::Widget => {
                    self.run_widget_screen(&classified.widgets, screen, cancel).await;
                    view = ScreenView::Player;
                }
            }
        }
    }

    /// 每个分组一个并发的轮播实例，整屏推进等最后一个分组收尾
    async fn run_ad_screen(&self, classified: &Classified, cancel: &CancellationToken) {
        let handles: Vec<_> = classified
            .ad_groups
            .iter()
            .enumerate()
            .map(|(pane, ads)| {
                tokio::spawn(rotation::run_group(
                    pane,
                    ads.clone(),
                    Arc::clone(&self.renderer),
                    Arc::clone(&self.logger),
                    cancel.child_token(),
                ))
            })
            .collect();

        for result in join_all(handles).await {
            if result.is_err() {
                debug!("rotation task aborted");
            }
        }
    }

    /// widget 屏
    ///
    /// 只有一个 widget 时静态常驻，不挂计时器也不发完成信号，
    /// 只能靠新数据（取消令牌）离开；多个时按固定间隔轮一圈后返回。
    async fn run_widget_screen(
        &self,
        widgets: &[Ad],
        screen: &ScreenConfig,
        cancel: &CancellationToken,
    ) {
        if widgets.len() == 1 {
            self.renderer.show_widget(&widgets[0], &screen.city);
            cancel.cancelled().await;
            return;
        }

        for widget in widgets {
            self.renderer.show_widget(widget, &screen.city);
            tokio::select! {
                _ = sleep(WIDGET_INTERVAL) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}
