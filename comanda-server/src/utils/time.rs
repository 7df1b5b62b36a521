//! 时间工具函数 - 业务时区转换
//!
//! "今天"、信用账期零点和小票时间全部按业务时区计算。

use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 时间戳所在的业务日期
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// 当前业务日期
pub fn today(tz: Tz) -> NaiveDate {
    local_date(Utc::now(), tz)
}

/// 小票时间格式 (dd/mm/YYYY HH:MM)
pub fn format_local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string()
}

/// 读取窗口起点: now - months
///
/// 月份溢出时退回 UNIX_EPOCH (不限制)
pub fn retention_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
