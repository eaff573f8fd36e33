// src/sched/admission.rs

use crate::model::ad::Ad;
use chrono::{DateTime, Datelike, Local, Timelike};

/// 星期名，下标与 `chrono::Weekday::num_days_from_sunday` 对齐
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn weekday_name(now: DateTime<Local>) -> &'static str {
    DAY_NAMES[now.weekday().num_days_from_sunday() as usize]
}

/// 当前星期是否在广告允许的星期集合里
pub fn day_ok(ad: &Ad, now: DateTime<Local>) -> bool {
    let today = weekday_name(now);
    ad.ad_configuration.days.iter().any(|d| d == today)
}

/// 是否已经出了 campaign 的整体投放区间
pub fn expired(ad: &Ad, now: DateTime<Local>) -> bool {
    let start = ad.ad_configuration.start_time.with_timezone(&Local);
    let end = ad.ad_configuration.end_time.with_timezone(&Local);
    now < start || now > end
}

/// 当前时刻是否落在投放区间和每日窗口内
///
/// 每日窗口由 start/end 的本地"时:分"推导，允许跨午夜：
/// 结束时刻早于开始时刻时，窗口是 [start, 24:00) 和 [00:00, end] 的并集，
/// 两端都取闭区间。
pub fn time_ok(ad: &Ad, now: DateTime<Local>) -> bool {
    let start = ad.ad_configuration.start_time.with_timezone(&Local);
    let end = ad.ad_configuration.end_time.with_timezone(&Local);

    if now < start || now > end {
        return false;
    }

    let daily_start = (start.hour(), start.minute());
    let daily_end = (end.hour(), end.minute());
    let current = (now.hour(), now.minute());

    if daily_end < daily_start {
        // 跨午夜窗口
        current >= daily_start || current <= daily_end
    } else {
        current >= daily_start && current <= daily_end
    }
}

/// 可播判定：星期、投放区间和每日窗口同时满足
pub fn admissible(ad: &Ad, now: DateTime<Local>) -> bool {
    day_ok(ad, now) && time_ok(ad, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad::{AdConfiguration, AdType};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("valid local time")
    }

    fn mk_ad(days: &[&str], start: DateTime<Local>, end: DateTime<Local>) -> Ad {
        Ad {
            ad_id: "ad".to_string(),
            ad_account_id: "acct".to_string(),
            campaign_id: "cmp".to_string(),
            ad_type: AdType::Image,
            ad_url: "http://cdn.local/a.jpg".to_string(),
            remote_url: None,
            upload_ref: "up".to_string(),
            upload_name: String::new(),
            campaign_view: 1,
            ad_configuration: AdConfiguration {
                days: days.iter().map(|d| d.to_string()).collect(),
                start_time: start.with_timezone(&Utc),
                end_time: end.with_timezone(&Utc),
                duration: 10,
            },
        }
    }

    // 2026-08-03 是周一
    #[test]
    fn overnight_window_monday_night_is_admissible() {
        let ad = mk_ad(
            &["Monday"],
            local(2026, 8, 2, 22, 0),
            local(2026, 8, 12, 2, 0),
        );
        assert!(admissible(&ad, local(2026, 8, 3, 23, 30)));
    }

    #[test]
    fn overnight_window_monday_morning_is_not_admissible_but_not_expired() {
        let ad = mk_ad(
            &["Monday"],
            local(2026, 8, 2, 22, 0),
            local(2026, 8, 12, 2, 0),
        );
        let monday_ten = local(2026, 8, 3, 10, 0);
        assert!(!admissible(&ad, monday_ten));
        assert!(day_ok(&ad, monday_ten));
        assert!(!expired(&ad, monday_ten));
    }

    #[test]
    fn overnight_window_includes_early_morning_tail() {
        let ad = mk_ad(
            &["Tuesday"],
            local(2026, 8, 2, 22, 0),
            local(2026, 8, 12, 2, 0),
        );
        // 周二凌晨 01:30 在 [22:00, 02:00] 的跨午夜并集里
        assert!(admissible(&ad, local(2026, 8, 4, 1, 30)));
        // 02:00 取闭区间
        assert!(admissible(&ad, local(2026, 8, 4, 2, 0)));
        assert!(!admissible(&ad, local(2026, 8, 4, 2, 1)));
    }

    #[test]
    fn same_day_window_boundaries_are_inclusive() {
        let ad = mk_ad(
            &DAY_NAMES,
            local(2026, 8, 1, 8, 0),
            local(2026, 8, 30, 17, 0),
        );
        assert!(admissible(&ad, local(2026, 8, 6, 8, 0)));
        assert!(admissible(&ad, local(2026, 8, 6, 12, 0)));
        assert!(admissible(&ad, local(2026, 8, 6, 17, 0)));
        assert!(!admissible(&ad, local(2026, 8, 6, 7, 59)));
        assert!(!admissible(&ad, local(2026, 8, 6, 17, 1)));
    }

    #[test]
    fn wrong_day_fails_even_inside_time_window() {
        let ad = mk_ad(
            &["Friday"],
            local(2026, 8, 1, 8, 0),
            local(2026, 8, 30, 17, 0),
        );
        // 2026-08-06 是周四
        assert!(!admissible(&ad, local(2026, 8, 6, 12, 0)));
        assert!(!day_ok(&ad, local(2026, 8, 6, 12, 0)));
    }

    #[test]
    fn outside_campaign_range_is_expired() {
        let ad = mk_ad(
            &DAY_NAMES,
            local(2026, 7, 1, 0, 0),
            local(2026, 7, 31, 23, 59),
        );
        let after = local(2026, 8, 6, 12, 0);
        assert!(expired(&ad, after));
        assert!(!admissible(&ad, after));

        let before = local(2026, 6, 30, 12, 0);
        assert!(expired(&ad, before));
    }

    proptest! {
        /// 每日窗口的判定等价于区间/并集的成员判断
        #[test]
        fn daily_window_matches_interval_semantics(
            sh in 0u32..24, sm in 0u32..60,
            eh in 0u32..24, em in 0u32..60,
            ch in 0u32..24, cm in 0u32..60,
        ) {
            // 投放区间横跨整个八月，只有每日窗口起作用
            let ad = mk_ad(
                &DAY_NAMES,
                local(2026, 8, 1, sh, sm),
                local(2026, 8, 31, eh, em),
            );
            let now = local(2026, 8, 15, ch, cm);

            let s = (sh, sm);
            let e = (eh, em);
            let c = (ch, cm);
            let expected = if e < s {
                c >= s || c <= e
            } else {
                c >= s && c <= e
            };
            prop_assert_eq!(time_ok(&ad, now), expected);
        }
    }
}
