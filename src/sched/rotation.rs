// src/sched/rotation.rs

use crate::logging::event_logger::EventLogger;
use crate::model::ad::Ad;
use crate::render::Renderer;
use crate::sched::admission;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 单个轮播分组的状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// 找第一个可播下标
    Selecting,
    /// 正在播（或评估）下标 i
    Playing(usize),
    /// 本轮结束，等所有分组会齐后整屏推进
    Done,
}

/// 一轮结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// 正常走到 Done
    Completed,
    /// 被取消（新数据到达），计时器已经停掉
    Cancelled,
}

/// 跑完一个分组的一轮轮播
///
/// 组内严格按数组顺序推进，不在组内回绕；回绕是父级整屏重启的事。
/// 规则：
/// - Selecting 找不到可播项时直接 Done，不播也不记日志；
/// - 过期条目静默跳过（长期下线的 campaign 不刷日志）；
/// - 只是不在星期/时段窗口内的条目记一条 skipped 再跳过；
/// - 可播条目记 play、渲染、挂 duration 计时器。
/// 取消令牌触发时立刻放弃挂着的计时器返回，绝不让旧计时器
/// 在分组已经易主之后再打进来。
pub async fn run_group(
    pane: usize,
    ads: Vec<Ad>,
    renderer: Arc<dyn Renderer>,
    logger: Arc<EventLogger>,
    cancel: CancellationToken,
) -> RotationOutcome {
    let mut state = RotationState::Selecting;

    loop {
        state = match state {
            RotationState::Selecting => {
                let now = Local::now();
                match ads.iter().position(|ad| admission::admissible(ad, now)) {
                    Some(i) => RotationState::Playing(i),
                    None => RotationState::Done,
                }
            }

            RotationState::Playing(i) => match ads.get(i) {
                None => RotationState::Done,
                Some(ad) => {
                    let now = Local::now();
                    if admission::expired(ad, now) {
                        RotationState::Playing(i + 1)
                    } else if !admission::admissible(ad, now) {
                        logger.skipped(ad);
                        RotationState::Playing(i + 1)
                    } else {
                        logger.play(ad);
                        renderer.show_ad(pane, ad);
                        let play_for = Duration::from_secs(ad.ad_configuration.duration);
                        tokio::select! {
                            _ = sleep(play_for) => RotationState::Playing(i + 1),
                            _ = cancel.cancelled() => {
                                debug!(pane, "rotation cancelled mid-play");
                                return RotationOutcome::Cancelled;
                            }
                        }
                    }
                }
            },

            RotationState::Done => {
                debug!(pane, "rotation pass complete");
                return RotationOutcome::Completed;
            }
        }
    }
}
