/*
 * opsis - datetime module.
 *
 * Copyright 2026 Opsis contributors
 *
 * This file is part of opsis.
 *
 * opsis is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * opsis is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with opsis. If not, see <http://www.gnu.org/licenses/>.
 */

use chrono::offset::Local;
use chrono::{NaiveDate, TimeZone};

pub type UnixTimestamp = u64;

/// Display format of the Date column.
pub const DATE_FORMAT: &str = "%Y/%m/%d %H:%M";

pub fn now() -> UnixTimestamp {
    let secs = Local::now().timestamp();
    if secs < 0 {
        0
    } else {
        secs as UnixTimestamp
    }
}

pub fn timestamp_to_string(timestamp: UnixTimestamp, fmt: Option<&str>) -> String {
    match Local.timestamp_opt(timestamp as i64, 0).single() {
        Some(t) => t.format(fmt.unwrap_or(DATE_FORMAT)).to_string(),
        None => String::new(),
    }
}

/// Parse a `YYYY-mm-dd` date into the timestamp of that day's midnight (UTC).
pub fn timestamp_from_date(s: &str) -> Option<UnixTimestamp> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let datetime = date.and_hms_opt(0, 0, 0)?;
    let secs = datetime.and_utc().timestamp();
    if secs < 0 {
        None
    } else {
        Some(secs as UnixTimestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_from_date() {
        assert_eq!(timestamp_from_date("1970-01-01"), Some(0));
        assert_eq!(timestamp_from_date("2020-02-30"), None);
        assert_eq!(timestamp_from_date("not a date"), None);
        assert!(timestamp_from_date("2020-01-02").unwrap() > 0);
    }
}
