// src/model/ad.rs

use chrono::{DateTime, Duration, Local, Utc};
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 广告素材类型
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Image,
    Video,
    Iframe,
}

/// 广告投放配置
///
/// `start_time`/`end_time` 是整个 campaign 的投放区间；
/// 每日播放窗口由两者的本地时刻（时:分）推导，允许跨午夜。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdConfiguration {
    pub days: Vec<String>,          // 允许播放的星期名（"Monday" 等）
    pub start_time: DateTime<Utc>,  // campaign 开始
    pub end_time: DateTime<Utc>,    // campaign 结束
    pub duration: u64,              // 单次播放时长（秒）
}

/// 播放列表中的单个广告
///
/// `ad_url` 在线上载荷里是远端地址，缓存完成后被改写为本地文件路径，
/// 原始地址保留在 `remote_url` 中供播放端兜底。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub ad_id: String,
    pub ad_account_id: String,
    pub campaign_id: String,
    pub ad_type: AdType,
    pub ad_url: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    pub upload_ref: String,
    #[serde(default)]
    pub upload_name: String,
    pub campaign_view: u32,         // 0 = widget 类；正数 = 轮播分组编号
    pub ad_configuration: AdConfiguration,
}

/// 屏幕配置，每次同步成功后整体替换，从不部分合并
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScreenConfig {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub layout_reference: String,
    #[serde(default)]
    pub screen_id: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub screen_height: String,
    #[serde(default)]
    pub screen_width: String,
    #[serde(default)]
    pub screen_resolution: String,
    #[serde(default)]
    pub screen_layout_config: ScreenLayoutConfig,
    #[serde(default)]
    pub ttl: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScreenLayoutConfig {
    #[serde(default)]
    pub width: u32,
}

/// 两条同步通路共用的载荷：`{config, data: [{campaigns}]}`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CampaignPayload {
    pub config: ScreenConfig,
    pub data: Vec<CampaignGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CampaignGroup {
    pub campaigns: Vec<Ad>,
}

impl CampaignPayload {
    /// 取第一组 campaigns（后端约定只有一组）
    pub fn campaigns(&self) -> &[Ad] {
        self.data.first().map(|g| g.campaigns.as_slice()).unwrap_or(&[])
    }
}

/// 同步成功后写入持久化存储的快照，启动兜底时原样读回
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PersistedSnapshot {
    pub ads: Vec<Ad>,
    pub screen: ScreenConfig,
}

/// 分类结果：轮播分组 + widget 序列
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub ad_groups: Vec<Vec<Ad>>,
    pub widgets: Vec<Ad>,
}

/// 把广告集合划分为轮播分组和 widgets
///
/// `campaign_view == 0` 的进 widgets；其余按 `campaign_view` 值分桶，
/// 桶的顺序按首次出现排列，空桶丢弃。同一个广告只会落入一个桶。
pub fn classify(ads: &[Ad]) -> Classified {
    let mut order: Vec<u32> = Vec::new();
    let mut buckets: HashMap<u32, Vec<Ad>> = HashMap::new();
    let mut widgets = Vec::new();

    for ad in ads {
        if ad.campaign_view == 0 {
            widgets.push(ad.clone());
            continue;
        }
        if !buckets.contains_key(&ad.campaign_view) {
            order.push(ad.campaign_view);
        }
        buckets.entry(ad.campaign_view).or_default().push(ad.clone());
    }

    Classified {
        ad_groups: order.into_iter().filter_map(|v| buckets.remove(&v)).collect(),
        widgets,
    }
}

/// 使用 proptest 生成一个随机广告
/// 素材文件名从固定小集合里取，保证指向 mock 后端 `/media/` 下存在的文件；
/// 投放区间为 [昨天 00:00, 30 天后]，每日窗口因此覆盖全天
fn generate_ad(media_base: String, view: u32) -> impl Strategy<Value = Ad> {
    let today = Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|t| t.and_local_timezone(Local).single())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let start = today - Duration::days(1);
    let end = today + Duration::days(30) + Duration::hours(23) + Duration::minutes(59);

    (
        prop::sample::select(vec!["spot-a.jpg", "spot-b.jpg", "clip-a.mp4"]),
        "[a-z]{5,12}",
        5u64..15u64,
    )
        .prop_map(move |(file, name, duration)| Ad {
            ad_id: Uuid::new_v4().to_string(),
            ad_account_id: format!("acct-{}", &Uuid::new_v4().to_string()[..8]),
            campaign_id: format!("cmp-{}", &Uuid::new_v4().to_string()[..8]),
            ad_type: if file.ends_with(".mp4") { AdType::Video } else { AdType::Image },
            ad_url: format!("{}/media/{}", media_base, file),
            remote_url: None,
            upload_ref: Uuid::new_v4().to_string(),
            upload_name: name,
            campaign_view: view,
            ad_configuration: AdConfiguration {
                days: ALL_DAYS.iter().map(|d| d.to_string()).collect(),
                start_time: start,
                end_time: end,
                duration,
            },
        })
}

const ALL_DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// 生成一份演示用的完整载荷：两个轮播分组、一个 widget，
/// 外加一条每日窗口已经过去的广告（演示 skipped 上报用）
pub fn demo_payload(media_base: &str, device_code: &str) -> CampaignPayload {
    let mut runner = proptest::test_runner::TestRunner::default();
    let base = media_base.to_string();

    let mut campaigns: Vec<Ad> = Vec::new();
    for (view, count) in [(1u32, 3usize), (2, 2)] {
        let ads = proptest::collection::vec(generate_ad(base.clone(), view), count)
            .new_tree(&mut runner)
            .expect("demo strategy")
            .current();
        campaigns.extend(ads);
    }

    // 每日窗口固定在凌晨 03:00-03:05 的广告，白天永远不可播
    if let Some(stale) = campaigns.first().cloned().map(|mut ad| {
        let day = Local::now().date_naive() - Duration::days(1);
        let start = day
            .and_hms_opt(3, 0, 0)
            .and_then(|t| t.and_local_timezone(Local).single())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        ad.ad_id = Uuid::new_v4().to_string();
        ad.campaign_view = 1;
        ad.ad_configuration.start_time = start;
        ad.ad_configuration.end_time = start + Duration::days(30) + Duration::minutes(5);
        ad
    }) {
        campaigns.push(stale);
    }

    // widget：时间/天气一类的补位屏
    campaigns.push(Ad {
        ad_id: "time".to_string(),
        ad_account_id: "system".to_string(),
        campaign_id: "widget".to_string(),
        ad_type: AdType::Iframe,
        ad_url: format!("{}/media/widget-clock.html", base),
        remote_url: None,
        upload_ref: Uuid::new_v4().to_string(),
        upload_name: "clock".to_string(),
        campaign_view: 0,
        ad_configuration: AdConfiguration {
            days: ALL_DAYS.iter().map(|d| d.to_string()).collect(),
            start_time: Utc::now() - Duration::days(1),
            end_time: Utc::now() + Duration::days(365),
            duration: 0,
        },
    });

    CampaignPayload {
        config: ScreenConfig {
            city: "Lagos".to_string(),
            device_id: device_code.to_string(),
            layout: "landscape-split".to_string(),
            layout_reference: "JHSFER2763".to_string(),
            screen_id: Uuid::new_v4().to_string(),
            screen_name: "demo screen".to_string(),
            screen_height: "1080".to_string(),
            screen_width: "1920".to_string(),
            screen_resolution: "1920x1080".to_string(),
            screen_layout_config: ScreenLayoutConfig { width: 1920 },
            ttl: "3600".to_string(),
        },
        data: vec![CampaignGroup { campaigns }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(id: &str, view: u32) -> Ad {
        Ad {
            ad_id: id.to_string(),
            ad_account_id: "a1".to_string(),
            campaign_id: "c1".to_string(),
            ad_type: AdType::Image,
            ad_url: format!("http://cdn.local/{}.jpg", id),
            remote_url: None,
            upload_ref: format!("ref-{}", id),
            upload_name: String::new(),
            campaign_view: view,
            ad_configuration: AdConfiguration {
                days: vec!["Monday".to_string()],
                start_time: Utc::now(),
                end_time: Utc::now(),
                duration: 10,
            },
        }
    }

    #[test]
    fn classify_partitions_by_first_seen_view_order() {
        let ads = vec![
            ad("w1", 0),
            ad("a", 2),
            ad("b", 1),
            ad("c", 2),
            ad("w2", 0),
            ad("d", 1),
        ];
        let classified = classify(&ads);

        assert_eq!(classified.ad_groups.len(), 2);
        // 分组按首次出现的 campaign_view 排序：先 2 后 1
        let ids: Vec<Vec<&str>> = classified
            .ad_groups
            .iter()
            .map(|g| g.iter().map(|a| a.ad_id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["a", "c"], vec!["b", "d"]]);
        let widget_ids: Vec<&str> = classified.widgets.iter().map(|a| a.ad_id.as_str()).collect();
        assert_eq!(widget_ids, vec!["w1", "w2"]);
    }

    #[test]
    fn classify_every_ad_lands_in_exactly_one_bucket() {
        let ads = vec![ad("a", 1), ad("b", 3), ad("c", 1), ad("w", 0)];
        let classified = classify(&ads);
        let total: usize = classified.ad_groups.iter().map(|g| g.len()).sum();
        assert_eq!(total + classified.widgets.len(), ads.len());
        assert!(classified.ad_groups.iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn payload_wire_format_roundtrip() {
        let raw = r#"{
            "config": {
                "city": "Lagos",
                "deviceId": "90J9R6",
                "layout": "l",
                "layoutReference": "VBSGTREW43",
                "screenId": "s1",
                "screenName": "front",
                "screenHeight": "1080",
                "screenWidth": "1920",
                "screenResolution": "1920x1080",
                "screenLayoutConfig": { "width": 1920 },
                "ttl": "60"
            },
            "data": [ { "campaigns": [ {
                "adId": "ad-1",
                "adAccountId": "acct-1",
                "campaignId": "cmp-1",
                "adType": "video",
                "adUrl": "https://cdn.local/clip.mp4",
                "uploadRef": "up-1",
                "uploadName": "clip",
                "campaignView": 1,
                "adConfiguration": {
                    "days": ["Monday", "Tuesday"],
                    "startTime": "2026-01-01T08:00:00Z",
                    "endTime": "2026-12-31T22:00:00Z",
                    "duration": 15
                }
            } ] } ]
        }"#;

        let payload: CampaignPayload = serde_json::from_str(raw).expect("parse payload");
        assert_eq!(payload.campaigns().len(), 1);
        let ad = &payload.campaigns()[0];
        assert_eq!(ad.ad_type, AdType::Video);
        assert_eq!(ad.campaign_view, 1);
        assert_eq!(ad.ad_configuration.duration, 15);
        assert!(ad.remote_url.is_none());
        assert_eq!(payload.config.layout_reference, "VBSGTREW43");

        // 回写的快照仍能按同一格式读出
        let json = serde_json::to_string(&payload).expect("serialize");
        let again: CampaignPayload = serde_json::from_str(&json).expect("reparse");
        assert_eq!(again.campaigns()[0].ad_id, "ad-1");
    }

    #[test]
    fn demo_payload_has_groups_and_widget() {
        let payload = demo_payload("http://127.0.0.1:9005", "ABC123");
        let classified = classify(payload.campaigns());
        assert_eq!(classified.ad_groups.len(), 2);
        assert_eq!(classified.widgets.len(), 1);
        assert!(payload
            .campaigns()
            .iter()
            .all(|ad| ad.ad_url.starts_with("http://127.0.0.1:9005/media/")));
    }
}
