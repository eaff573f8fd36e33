// src/model/layout.rs

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

/// 单个 layoutReference 对应的分屏描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub landscape: bool,            // 横屏 / 竖屏
    pub horizontal: bool,           // 分屏方向
    pub split: Option<(u8, u8)>,    // 各 pane 占比（百分数），None = 单 pane 全屏
}

impl LayoutConfig {
    pub const FULLSCREEN: LayoutConfig = LayoutConfig {
        landscape: true,
        horizontal: false,
        split: None,
    };

    /// 该布局的 pane 数
    pub fn pane_count(&self) -> usize {
        match self.split {
            Some(_) => 2,
            None => 1,
        }
    }
}

/// 后端下发的 layoutReference 到布局描述的映射表
static LAYOUTS: Lazy<HashMap<&'static str, LayoutConfig>> = Lazy::new(|| {
    HashMap::from([
        ("VBSGTREW43", LayoutConfig { landscape: true, horizontal: false, split: None }),
        ("JHSFER2763", LayoutConfig { landscape: true, horizontal: true, split: Some((80, 20)) }),
        ("HDGTW5763", LayoutConfig { landscape: false, horizontal: false, split: None }),
        ("SGDRWT5247", LayoutConfig { landscape: true, horizontal: true, split: Some((50, 50)) }),
        ("KJUYTE4352", LayoutConfig { landscape: false, horizontal: false, split: Some((80, 20)) }),
        ("SGHY5438JH", LayoutConfig { landscape: false, horizontal: false, split: Some((50, 50)) }),
    ])
});

/// 查布局表；未知引用记一条 warn 并退回单 pane 全屏
pub fn resolve(layout_reference: &str) -> LayoutConfig {
    match LAYOUTS.get(layout_reference) {
        Some(cfg) => *cfg,
        None => {
            warn!("unknown layoutReference '{}', falling back to fullscreen", layout_reference);
            LayoutConfig::FULLSCREEN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reference_resolves() {
        let cfg = resolve("JHSFER2763");
        assert!(cfg.landscape && cfg.horizontal);
        assert_eq!(cfg.split, Some((80, 20)));
        assert_eq!(cfg.pane_count(), 2);
    }

    #[test]
    fn unknown_reference_falls_back_to_fullscreen() {
        assert_eq!(resolve("NOPE"), LayoutConfig::FULLSCREEN);
        assert_eq!(resolve("").pane_count(), 1);
    }
}
