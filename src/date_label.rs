//! Human-readable labels for entry dates.

use chrono::{Datelike, Local, NaiveDate};

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Label for a row in the entry list: "Today", "Yesterday", or a short
/// month/day with the year only when it differs from the current one.
pub fn entry_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return "Today".to_string();
    }
    if today.pred_opt() == Some(date) {
        return "Yesterday".to_string();
    }
    if date.year() == today.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// Long form shown while today's entry is open, e.g. "Tuesday, January 16, 2024".
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Heading above the editor for the open entry.
pub fn entry_heading(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        long_date(today)
    } else {
        format!("{} Entry", entry_label(date, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn relative_labels() {
        let today = day(2024, 3, 1);
        assert_eq!(entry_label(today, today), "Today");
        assert_eq!(entry_label(day(2024, 2, 29), today), "Yesterday");
    }

    #[test]
    fn year_only_when_different() {
        let today = day(2024, 1, 1);
        assert_eq!(entry_label(day(2024, 1, 20), today), "Jan 20");
        assert_eq!(entry_label(day(2023, 12, 30), today), "Dec 30, 2023");
        // yesterday across a year boundary is still "Yesterday"
        assert_eq!(entry_label(day(2023, 12, 31), today), "Yesterday");
    }

    #[test]
    fn headings() {
        let today = day(2024, 1, 16);
        assert_eq!(entry_heading(today, today), "Tuesday, January 16, 2024");
        assert_eq!(entry_heading(day(2024, 1, 15), today), "Yesterday Entry");
        assert_eq!(entry_heading(day(2024, 1, 2), today), "Jan 2 Entry");
    }
}
