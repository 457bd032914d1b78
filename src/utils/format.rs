use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{self, de::Error, Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used by the SGS API for both requests and payloads
pub const BCB_DATE_FORMAT: &str = "%d/%m/%Y";

/// Timestamp suffix used in generated file names
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format(FORMAT).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    // First, try parsing our custom format.
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&s, FORMAT) {
        Ok(naive_dt.and_utc())
    } else {
        // If that fails, try parsing the RFC 3339 format for backward compatibility.
        s.parse::<DateTime<Utc>>().map_err(Error::custom)
    }
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(FORMAT).to_string()
}

pub fn format_bcb_date(date: &NaiveDate) -> String {
    date.format(BCB_DATE_FORMAT).to_string()
}

pub fn parse_bcb_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), BCB_DATE_FORMAT).ok()
}

/// Accepts either `dd/mm/YYYY` or ISO `YYYY-mm-dd`
pub fn parse_user_date(s: &str) -> Option<NaiveDate> {
    parse_bcb_date(s).or_else(|| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

/// Parse an SGS value string. The API uses a dot decimal separator but some
/// series come back with a comma, and blanks mean "no observation".
pub fn parse_bcb_value(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let value = trimmed.replace(',', ".").parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

pub fn format_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bcb_date() {
        assert_eq!(
            parse_bcb_date("01/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_bcb_date("2024-03-01"), None);
        assert_eq!(
            parse_user_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_parse_bcb_value() {
        assert_eq!(parse_bcb_value("0.42"), Some(0.42));
        assert_eq!(parse_bcb_value(" 5,25 "), Some(5.25));
        assert_eq!(parse_bcb_value(""), None);
        assert_eq!(parse_bcb_value("-"), None);
        assert_eq!(parse_bcb_value("n/a"), None);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("inflation", 20), "inflation");
        assert_eq!(truncate_string("reservas_internacionais", 10), "reserva...");
        assert_eq!(truncate_string("abcdef", 2), "ab");
    }
}
