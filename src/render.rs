// src/render.rs

use crate::model::ad::Ad;
use tracing::info;

/// 渲染协作方的接口
///
/// 核心只负责"现在该播什么"，真正的图片/视频/iframe 绘制、
/// 布局样式都在这个 seam 之外。`pane` 是分屏布局里的窗格下标。
pub trait Renderer: Send + Sync {
    fn show_ad(&self, pane: usize, ad: &Ad);
    /// widget 地址按约定追加 `?location={city}`
    fn show_widget(&self, widget: &Ad, city: &str);
    /// 没有任何可播内容时的占位屏
    fn show_empty(&self);
    /// 首次加载的阻塞式 loading 指示
    fn set_loading(&self, active: bool);
    /// 后台换播放列表时的角标指示，不打断当前播放
    fn set_background_loading(&self, active: bool);
}

/// 控制台渲染器：把播放指令打成结构化日志，设备调试和演示用
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn show_ad(&self, pane: usize, ad: &Ad) {
        info!(
            pane,
            ad_id = %ad.ad_id,
            ad_type = ?ad.ad_type,
            url = %ad.ad_url,
            duration = ad.ad_configuration.duration,
            "render ad"
        );
    }

    fn show_widget(&self, widget: &Ad, city: &str) {
        info!(
            widget_id = %widget.ad_id,
            url = %format!("{}?location={}", widget.ad_url, city),
            "render widget"
        );
    }

    fn show_empty(&self) {
        info!("render placeholder: no active campaigns");
    }

    fn set_loading(&self, active: bool) {
        info!(active, "loading indicator");
    }

    fn set_background_loading(&self, active: bool) {
        info!(active, "background loading indicator");
    }
}
