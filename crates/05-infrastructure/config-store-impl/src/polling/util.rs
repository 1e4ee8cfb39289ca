//! 轮询时间计算与属性解析

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use config_store_common::{PollingError, PollingResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

const ONE_DAY_MILLIS: u128 = 24 * 60 * 60 * 1000;
const MINIMUM_INTERVAL_MILLIS: u128 = 2000;

static ISO_DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^P(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)(?:\.(?P<fraction>\d{1,9}))?S)?)?$",
    )
    .expect("static regex")
});

/// 间隔是否无效：小于 2 秒、大于 24 小时或不能整除 24 小时
pub fn is_invalid_interval(interval: Duration) -> bool {
    let millis = interval.as_millis();
    millis < MINIMUM_INTERVAL_MILLIS || millis > ONE_DAY_MILLIS || ONE_DAY_MILLIS % millis != 0
}

/// 校验轮询间隔
pub fn validate_interval(interval: Duration) -> PollingResult<()> {
    if is_invalid_interval(interval) {
        return Err(PollingError::InvalidInterval {
            interval: format_iso_duration(interval),
        });
    }
    Ok(())
}

/// 首次轮询时间：网格 `time_of_day + k * interval` 上严格晚于 `now` 的第一个时刻
pub fn first_poll_time(
    now: DateTime<Utc>,
    time_of_day_utc: NaiveTime,
    interval: Duration,
) -> PollingResult<DateTime<Utc>> {
    validate_interval(interval)?;
    let interval_millis = interval.as_millis() as i64;
    let anchor = now.date_naive().and_time(time_of_day_utc).and_utc();
    let elapsed = (now - anchor).num_milliseconds();
    let steps = elapsed.div_euclid(interval_millis) + 1;
    Ok(anchor + TimeDelta::milliseconds(steps * interval_millis))
}

/// 解析 ISO-8601 时长，例如 `PT2H`、`PT30S`、`P1D`
pub fn parse_iso_duration(value: &str) -> PollingResult<Duration> {
    let invalid = |message: &str| PollingError::Parse {
        value: value.to_string(),
        message: message.to_string(),
    };
    let trimmed = value.trim();
    let captures = ISO_DURATION_PATTERN
        .captures(trimmed)
        .ok_or_else(|| invalid("not an ISO-8601 duration"))?;
    if trimmed.eq_ignore_ascii_case("P") || trimmed.to_ascii_uppercase().ends_with('T') {
        return Err(invalid("duration has no components"));
    }

    let number = |name: &str| -> PollingResult<u64> {
        captures
            .name(name)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(|e| invalid(&e.to_string()))
    };
    let overflow = || invalid("duration overflows");
    let mut seconds: u64 = 0;
    for (name, unit) in [("days", 86_400u64), ("hours", 3600), ("minutes", 60), ("seconds", 1)] {
        seconds = number(name)?
            .checked_mul(unit)
            .and_then(|part| seconds.checked_add(part))
            .ok_or_else(overflow)?;
    }
    let nanos = match captures.name("fraction") {
        Some(m) => {
            let digits = m.as_str();
            let value: u32 = digits.parse().map_err(|_| invalid("invalid fraction"))?;
            value * 10u32.pow(9 - digits.len() as u32)
        }
        None => 0,
    };
    Ok(Duration::new(seconds, nanos))
}

/// 格式化为 ISO-8601 时长
pub fn format_iso_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 && duration.subsec_nanos() == 0 {
        return "PT0S".to_string();
    }
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    let millis = duration.subsec_millis();
    if seconds > 0 || millis > 0 {
        if millis > 0 {
            let fraction = format!("{millis:03}");
            out.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

/// 解析 `HH:MM` 或 `HH:MM:SS`
pub fn parse_time_of_day(value: &str) -> PollingResult<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|e| PollingError::Parse {
            value: value.to_string(),
            message: e.to_string(),
        })
}
