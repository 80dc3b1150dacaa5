use crate::models::DateRange;
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// 时钟 (可注入, 便于确定性测试)
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟, 可手动推进
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.write() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// "本地" 自然日所用的时区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    /// 固定偏移 (配置指定), 每天恰好 24 小时
    Fixed(FixedOffset),
    /// 主机时区, 每次计算时解析, 夏令时切换日可能是 23 或 25 小时
    Host,
}

impl From<FixedOffset> for DayZone {
    fn from(offset: FixedOffset) -> Self {
        DayZone::Fixed(offset)
    }
}

impl DayZone {
    /// 某本地日期零点对应的 UTC 时刻
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        match self {
            DayZone::Fixed(offset) => start_of_day(offset, date),
            DayZone::Host => start_of_day(&Local, date),
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            DayZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
            DayZone::Host => instant.with_timezone(&Local).date_naive(),
        }
    }
}

/// 零点落在夏令时跳变的空档里时, 取当天第一个存在的整点
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
}

/// 日期区间计算 (本地时区的自然日, 半开区间)
#[derive(Clone)]
pub struct DateRangeCalculator {
    clock: Arc<dyn Clock>,
    zone: DayZone,
}

impl DateRangeCalculator {
    pub fn new(clock: Arc<dyn Clock>, zone: impl Into<DayZone>) -> Self {
        Self {
            clock,
            zone: zone.into(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 今日: 本地零点 ~ 次日零点
    pub fn today_range(&self) -> DateRange {
        let today = self.zone.local_date(self.clock.now());
        DateRange::new(self.zone.midnight(today), self.zone.midnight(today + Duration::days(1)))
    }

    /// 昨日: today_start 所在本地日的前一天
    pub fn yesterday_range(&self, today_start: DateTime<Utc>) -> DateRange {
        let yesterday = self.zone.local_date(today_start) - Duration::days(1);
        DateRange::new(self.zone.midnight(yesterday), today_start)
    }

    /// [anchor - days, anchor)
    pub fn trailing_window(&self, days: u32, anchor: DateTime<Utc>) -> DateRange {
        DateRange::new(anchor - Duration::days(i64::from(days)), anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_today_range_in_utc() {
        let clock = Arc::new(FixedClock::new(at("2026-05-10T15:30:00Z")));
        let calc = DateRangeCalculator::new(clock, FixedOffset::east_opt(0).unwrap());

        let today = calc.today_range();
        assert_eq!(today.start, at("2026-05-10T00:00:00Z"));
        assert_eq!(today.end, at("2026-05-11T00:00:00Z"));
        assert!(!today.contains(today.end));
        assert!(today.contains(today.start));
    }

    #[test]
    fn test_today_range_respects_local_offset() {
        // UTC 02:00 在 UTC-5 仍是前一天 21:00
        let clock = Arc::new(FixedClock::new(at("2026-05-10T02:00:00Z")));
        let calc = DateRangeCalculator::new(clock, FixedOffset::west_opt(5 * 3600).unwrap());

        let today = calc.today_range();
        assert_eq!(today.start, at("2026-05-09T05:00:00Z"));
        assert_eq!(today.end, at("2026-05-10T05:00:00Z"));
    }

    #[test]
    fn test_yesterday_and_trailing_windows_are_adjacent() {
        let clock = Arc::new(FixedClock::new(at("2026-05-10T12:00:00Z")));
        let calc = DateRangeCalculator::new(clock, FixedOffset::east_opt(0).unwrap());

        let today = calc.today_range();
        let yesterday = calc.yesterday_range(today.start);
        assert_eq!(yesterday.end, today.start);
        assert_eq!(yesterday.duration(), Duration::days(1));

        let week = calc.trailing_window(7, today.end);
        assert_eq!(week.start, at("2026-05-04T00:00:00Z"));
        assert_eq!(week.preceding().end, week.start);
    }

    #[test]
    fn test_host_zone_starts_at_local_midnight() {
        let now = at("2026-05-10T15:30:00Z");
        let calc = DateRangeCalculator::new(Arc::new(FixedClock::new(now)), DayZone::Host);

        let today = calc.today_range();
        assert!(today.contains(now));
        assert_eq!(today.start.with_timezone(&Local).date_naive(), now.with_timezone(&Local).date_naive());
        assert_eq!(today.start.with_timezone(&Local).time(), chrono::NaiveTime::MIN);
        assert_eq!(today.end.with_timezone(&Local).time(), chrono::NaiveTime::MIN);
        assert_eq!(calc.yesterday_range(today.start).end, today.start);
    }

    #[test]
    fn test_host_zone_is_resolved_per_call() {
        // 时钟跨越数月 (可能跨夏令时切换), 每次都应落在当地零点
        let clock = FixedClock::new(at("2026-01-15T12:00:00Z"));
        let calc = DateRangeCalculator::new(Arc::new(clock.clone()), DayZone::Host);
        for _ in 0..12 {
            let today = calc.today_range();
            assert_eq!(today.start.with_timezone(&Local).time(), chrono::NaiveTime::MIN);
            assert!(today.contains(clock.now()));
            clock.advance(Duration::days(30));
        }
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(at("2026-05-10T12:00:00Z"));
        clock.advance(Duration::minutes(16));
        assert_eq!(clock.now(), at("2026-05-10T12:16:00Z"));
    }
}
