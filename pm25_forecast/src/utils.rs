//! Utility functions for the pm25_forecast crate

/// Split time-ordered rows into a leading training slice and a trailing
/// test slice.
///
/// The split index is `floor(len * train_ratio)`; rows are never shuffled,
/// so every training row precedes every test row.
pub fn chronological_split<T>(rows: &[T], train_ratio: f64) -> (&[T], &[T]) {
    let ratio = train_ratio.clamp(0.0, 1.0);
    let split = ((rows.len() as f64) * ratio).floor() as usize;
    rows.split_at(split.min(rows.len()))
}

/// Round to a fixed number of decimal places for display
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

pub mod date_parser {
    //! Lenient timestamp parsing for ingested records

    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    /// Parse RFC 3339, naive date-time (taken as UTC) or a bare date
    /// (midnight UTC)
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|date| {
            let naive = NaiveDateTime::new(date, NaiveTime::default());
            DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::date_parser::parse_timestamp;
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_split_sizes() {
        let rows: Vec<usize> = (0..10).collect();
        let (train, test) = chronological_split(&rows, 0.8);
        assert_eq!(train, &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(test, &[8, 9]);

        // floor, not round
        let rows: Vec<usize> = (0..7).collect();
        let (train, test) = chronological_split(&rows, 0.8);
        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 2);

        let empty: Vec<usize> = Vec::new();
        let (train, test) = chronological_split(&empty, 0.8);
        assert!(train.is_empty() && test.is_empty());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-1.005, 0), -1.0);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T16:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }
}
