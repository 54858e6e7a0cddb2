// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::param::{HTTP_DATE_FORMAT, HTTP_DATE_GMT_TIMEZONE};

/// 将时间格式化为 `Tue, 04 Mar 2025 08:15:30 GMT` 形式的 HTTP 日期，精度为秒。
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    format!("{} {}", date.format(HTTP_DATE_FORMAT), HTTP_DATE_GMT_TIMEZONE)
}

pub fn format_system_time(time: SystemTime) -> String {
    format_http_date(&DateTime::<Utc>::from(time))
}

/// 以 US-ASCII 编码文本，非 ASCII 字符替换为 `?`。
pub fn encode_us_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// 取文件名最后一个 `.` 之后的部分作为扩展名，统一转为小写。
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_format_http_date() {
        let date = Utc.with_ymd_and_hms(2025, 3, 4, 8, 15, 30).unwrap();
        assert_eq!(format_http_date(&date), "Tue, 04 Mar 2025 08:15:30 GMT");
    }

    #[test]
    fn test_format_system_time_truncates_to_seconds() {
        let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let later = base + Duration::from_millis(999);
        assert_eq!(format_system_time(base), format_system_time(later));
        assert_eq!(format_system_time(base), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_encode_us_ascii() {
        assert_eq!(encode_us_ascii("body { }"), b"body { }".to_vec());
        assert_eq!(encode_us_ascii("café"), b"caf?".to_vec());
        assert_eq!(encode_us_ascii("你好"), b"??".to_vec());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("app.css"), "css");
        assert_eq!(extension_of("photo.PNG"), "png");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".hidden"), "");
    }
}
