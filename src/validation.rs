use crate::scraper::ScrapeError;

/// Group ids and teacher names: empty and `"0"` (the "nothing selected" entry) are rejected.
pub fn validate_label(label: &str) -> Result<&str, ScrapeError> {
    let label = label.trim();
    if label.is_empty() || label == "0" {
        Err(ScrapeError::InvalidArgument(
            "group or teacher must be selected".into(),
        ))
    } else {
        Ok(label)
    }
}

pub fn validate_page(page: u32) -> Result<u32, ScrapeError> {
    if page >= 1 {
        Ok(page)
    } else {
        Err(ScrapeError::InvalidArgument(
            "page must be greater than zero".into(),
        ))
    }
}
