use chrono::{Datelike, NaiveDate};

use crate::scraper::ScrapeError;

const REQUEST_DATE_FORMAT: &str = "%d.%m.%Y";

/// Converts a header date such as `19 февраля 2024` into `19.02.2024`.
pub fn localize(raw: &str) -> Result<String, ScrapeError> {
    let tokens: Vec<&str> = raw.split(' ').collect();
    let [day, month, year] = tokens.as_slice() else {
        return Err(ScrapeError::UnknownMonth(raw.to_string()));
    };

    let prefix: String = month.chars().take(3).collect::<String>().to_lowercase();
    let numeric = match prefix.as_str() {
        "янв" => "01",
        "фев" => "02",
        "мар" => "03",
        "апр" => "04",
        // nominative and genitive forms differ in the third letter
        "май" | "мая" => "05",
        "июн" => "06",
        "июл" => "07",
        "авг" => "08",
        "сен" => "09",
        "окт" => "10",
        "ноя" => "11",
        "дек" => "12",
        _ => return Err(ScrapeError::UnknownMonth(raw.to_string())),
    };

    Ok(format!("{day}.{numeric}.{year}"))
}

/// Strict `dd.mm.yyyy`: chrono alone would also take unpadded `1.2.2024`.
pub fn parse_request_date(date: &str) -> Result<NaiveDate, ScrapeError> {
    let trimmed = date.trim();
    let padded = trimmed
        .split('.')
        .map(str::len)
        .eq([2usize, 2, 4])
        && trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if !padded {
        return Err(ScrapeError::DateParse(date.to_string()));
    }

    NaiveDate::parse_from_str(trimmed, REQUEST_DATE_FORMAT)
        .map_err(|_| ScrapeError::DateParse(date.to_string()))
}

pub fn format_request_date(date: NaiveDate) -> String {
    date.format(REQUEST_DATE_FORMAT).to_string()
}

/// Schedules are cached per ISO week, so any day of the same week shares a key.
pub fn week_cache_key(date: NaiveDate, label: &str) -> String {
    let week = date.iso_week();
    format!("{}/{}:{}", week.year(), week.week(), label)
}
