// src/calendar.rs
//
// Trading-session calendar helpers on raw nanosecond timestamps: the US
// session windows in UTC, the daylight-savings date rule, and the
// daily-settlement trigger. The engine consults `can_trade` before
// executing matured orders; order *placement* is never gated.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};

use crate::config::{RunParams, NS_PER_HOUR};
use crate::types::TimeStamp;

const NS_PER_DAY: u64 = 24 * NS_PER_HOUR;

/// Session windows as minutes of the UTC day.
const REGULAR_START_DST: u32 = 13 * 60 + 30;
const REGULAR_END_DST: u32 = 20 * 60;
const REGULAR_START_STD: u32 = 14 * 60 + 30;
const REGULAR_END_STD: u32 = 21 * 60;
const PREMARKET_START: u32 = 9 * 60;
/// Non-DST after-hours runs through midnight into [00:00, 01:00).
const AFTER_HOURS_STD_WRAP_END: u32 = 60;

/// Trading-hours gate built from run parameters.
#[derive(Debug, Clone, Copy)]
pub struct TradingCalendar {
    pub enforce_trading_hours: bool,
    pub allow_extended_hours: bool,
    pub daylight_savings: bool,
}

impl TradingCalendar {
    pub fn from_params<FB, FS>(params: &RunParams<FB, FS>) -> TradingCalendar {
        TradingCalendar {
            enforce_trading_hours: params.enforce_trading_hours,
            allow_extended_hours: params.allow_extended_hours,
            daylight_savings: params.daylight_savings,
        }
    }

    /// Whether an execution may happen at `ts`. Pure function of the
    /// timestamp; no hysteresis.
    pub fn can_trade(&self, ts: TimeStamp) -> bool {
        if !self.enforce_trading_hours {
            return true;
        }

        let dt = utc(ts);
        if matches!(dt.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let minute = dt.hour() * 60 + dt.minute();
        let (start, end) = if self.daylight_savings {
            (REGULAR_START_DST, REGULAR_END_DST)
        } else {
            (REGULAR_START_STD, REGULAR_END_STD)
        };

        if minute >= start && minute < end {
            return true;
        }
        if !self.allow_extended_hours {
            return false;
        }

        let premarket = minute >= PREMARKET_START && minute < start;
        let after_hours = if self.daylight_savings {
            minute >= end
        } else {
            minute >= end || minute < AFTER_HOURS_STD_WRAP_END
        };
        premarket || after_hours
    }
}

/// US daylight-savings rule: active from the second Sunday of March
/// through the day before the first Sunday of November.
pub fn is_us_dst(ts: TimeStamp) -> bool {
    let date = utc(ts).date_naive();
    let year = date.year();
    let dst_start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2);
    let dst_end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1);
    match (dst_start, dst_end) {
        (Some(start), Some(end)) => date >= start && date < end,
        _ => false,
    }
}

/// Daily settlement trigger: fires at or after 09:00 UTC on a calendar
/// day strictly greater than the day of `last_settlement`.
pub fn is_settlement_due(now: TimeStamp, last_settlement: TimeStamp) -> bool {
    let current_day = now.nanos() / NS_PER_DAY;
    let last_day = last_settlement.nanos() / NS_PER_DAY;
    if current_day <= last_day {
        return false;
    }
    let time_in_day = now.nanos() % NS_PER_DAY;
    time_in_day >= 9 * NS_PER_HOUR
}

/// Render a timestamp for report tables.
pub fn format_utc(ts: TimeStamp) -> String {
    utc(ts).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn utc(ts: TimeStamp) -> DateTime<Utc> {
    let secs = (ts.nanos() / 1_000_000_000) as i64;
    let subsec = (ts.nanos() % 1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec).unwrap_or(DateTime::UNIX_EPOCH)
}
