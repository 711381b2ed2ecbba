use scraper::Html;

use crate::models::ScheduleOption;
use crate::schedule::ScheduleLayout;

/// Reads the filter drop-down of a schedule page. Entries without a value are skipped.
pub fn extract_options<L: ScheduleLayout>(document: &Html) -> Vec<ScheduleOption> {
    document
        .select(L::options_selector())
        .filter_map(|option| {
            let value = option.value().attr("value")?.trim();
            if value.is_empty() {
                return None;
            }
            Some(ScheduleOption {
                label: option.text().collect::<String>().trim().to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
