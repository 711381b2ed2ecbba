//! Weekly schedule extraction.
//!
//! The site renders group and teacher schedules with different table layouts,
//! so each view is a [`ScheduleLayout`] with its own row parsing rules. The
//! day-level walk in [`extract_day`] is shared.

mod group;
mod teacher;

use std::ops::RangeInclusive;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::dates::localize;
use crate::models::{DaySchedule, Lesson, Subgroup};
use crate::scraper::ScrapeError;

pub use group::GroupLayout;
pub use teacher::{TeacherLayout, split_room};

pub const DAYS_PER_WEEK: usize = 7;

/// Upper bound on rows read for a single day.
pub const MAX_ROWS_PER_DAY: usize = 200;

/// Fixed marker parameter the site's filter form submits.
pub const SEND_MARKER: &str = "Показать";

pub trait ScheduleLayout: Send + Sync + 'static {
    /// Schedule page path relative to the site root.
    const PAGE_PATH: &'static str;
    /// Query parameter carrying the group id or teacher name.
    const QUERY_PARAM: &'static str;
    const OPTIONS_CACHE_KEY: &'static str;
    /// `:nth-child` index of the first day container.
    const FIRST_DAY: usize;

    fn lessons_selector(day: usize) -> String;

    fn options_selector() -> &'static Selector;

    /// Builds the lesson for one table row, `None` when the row ends the day.
    fn extract_lesson(row: ElementRef<'_>, previous_number: &str) -> Option<Lesson>;

    fn days() -> RangeInclusive<usize> {
        Self::FIRST_DAY..=Self::FIRST_DAY + DAYS_PER_WEEK - 1
    }
}

pub fn schedule_url<L: ScheduleLayout>(page_url: &Url, label: &str, date: &str) -> Url {
    let mut url = page_url.clone();
    url.query_pairs_mut()
        .append_pair(L::QUERY_PARAM, label)
        .append_pair("date_edu1c", date)
        .append_pair("send", SEND_MARKER);
    url
}

pub fn extract_week<L: ScheduleLayout>(
    document: &Html,
    page_url: &Url,
    label: &str,
) -> Result<Vec<DaySchedule>, ScrapeError> {
    L::days()
        .map(|day| extract_day::<L>(document, day, page_url, label))
        .collect()
}

pub fn extract_day<L: ScheduleLayout>(
    document: &Html,
    day: usize,
    page_url: &Url,
    label: &str,
) -> Result<DaySchedule, ScrapeError> {
    let heading_sel = selector(&format!(
        "div.raspcontent.m5 div:nth-child({day}) div.panel-heading.edu_today > h2"
    ))?;
    let heading = document
        .select(&heading_sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("date header for day {day} not found")))?;
    let date = element_text(heading);

    let raw_date = date.split(',').next().unwrap_or_default().trim();
    let mut href = schedule_url::<L>(page_url, label, &localize(raw_date)?);
    href.set_fragment(Some("current"));

    let mut lessons = Vec::new();
    let lessons_sel = selector(&L::lessons_selector(day))?;
    if let Some(body) = document.select(&lessons_sel).next() {
        let mut previous_number = String::new();
        for index in 1..=MAX_ROWS_PER_DAY {
            let Some(lesson) =
                nth_child(body, index, "tr").and_then(|row| L::extract_lesson(row, &previous_number))
            else {
                break;
            };
            previous_number.clone_from(&lesson.number);
            lessons.push(lesson);
        }
        if lessons.len() == MAX_ROWS_PER_DAY {
            warn!(day, label, "row limit reached, remaining rows ignored");
        }
    }

    Ok(DaySchedule {
        date,
        lessons,
        href: href.to_string(),
    })
}

pub(crate) fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|err| ScrapeError::Parse(format!("invalid selector {css:?}: {err}")))
}

/// The `n`-th element child (1-based, as in `:nth-child`), if it has the given tag.
pub(crate) fn nth_child<'a>(parent: ElementRef<'a>, n: usize, tag: &str) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .nth(n.checked_sub(1)?)
        .filter(|el| el.value().name() == tag)
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("").trim().to_string()
}

/// Strips a trailing `(1)` / `(2)` subgroup marker from a subject name.
pub(crate) fn split_subgroup(text: &str) -> (String, Subgroup) {
    if let Some(name) = text.strip_suffix("(1)") {
        (name.trim_end().to_string(), Subgroup::First)
    } else if let Some(name) = text.strip_suffix("(2)") {
        (name.trim_end().to_string(), Subgroup::Second)
    } else {
        (text.to_string(), Subgroup::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_PAGE: &str = r#"
        <html><body>
        <div class="raspcontent m5">
            <div class="filters">filters</div>
            <div>
                <div class="panel-heading edu_today"><h2>19 февраля 2024, понедельник</h2></div>
                <div class="panel-body">
                    <table id="mobile-friendly">
                        <thead><tr><th>№</th><th>Время</th><th>Предмет</th><th>Кабинет</th><th>Преподаватель</th></tr></thead>
                        <tbody>
                            <tr>
                                <td data-title="Номер урока">1</td>
                                <td data-title="Время">08:30 - 09:15</td>
                                <td data-title="Название предмета">Математика (1)</td>
                                <td data-title="Кабинет">А-12</td>
                                <td data-title="Преподаватель">Иванова И.И.</td>
                            </tr>
                            <tr>
                                <td data-title="Номер урока"></td>
                                <td data-title="Время">09:25 - 10:10</td>
                                <td data-title="Название предмета">Математика (2)</td>
                                <td data-title="Кабинет">А-14</td>
                                <td data-title="Преподаватель">Петров П.П.</td>
                            </tr>
                            <tr>
                                <td data-title="Номер урока">2</td>
                                <td data-title="Время">10:20 - 11:50</td>
                                <td data-title="Название предмета">Физика</td>
                                <td data-title="Кабинет">Б-3</td>
                            </tr>
                        </tbody>
                    </table>
                </div>
            </div>
            <div>
                <div class="panel-heading edu_today"><h2>20 февраля 2024, вторник</h2></div>
                <div class="panel-body">
                    <table id="mobile-friendly">
                        <thead><tr><th>№</th></tr></thead>
                        <tbody></tbody>
                    </table>
                </div>
            </div>
            <div>
                <div class="panel-heading edu_today"><h2>21 фврл 2024, среда</h2></div>
            </div>
        </div>
        </body></html>
    "#;

    fn page_url() -> Url {
        Url::parse("https://hmtpk.ru/ru/students/schedule/").unwrap()
    }

    #[test]
    fn test_extract_day_with_lessons() {
        let document = Html::parse_document(GROUP_PAGE);
        let day = extract_day::<GroupLayout>(&document, 2, &page_url(), "114808").unwrap();

        assert_eq!(day.date, "19 февраля 2024, понедельник");
        assert_eq!(day.lessons.len(), 3);
        assert_eq!(day.lessons[0].subject, "Математика");
        assert_eq!(day.lessons[0].subgroup, Subgroup::First);
        assert_eq!(day.lessons[1].number, "1");
        assert_eq!(day.lessons[1].subgroup, Subgroup::Second);
        assert_eq!(day.lessons[2].number, "2");
        assert_eq!(day.lessons[2].teacher, "");

        let href = Url::parse(&day.href).unwrap();
        assert_eq!(href.fragment(), Some("current"));
        let pairs: Vec<(String, String)> = href.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("group".to_string(), "114808".to_string()),
                ("date_edu1c".to_string(), "19.02.2024".to_string()),
                ("send".to_string(), SEND_MARKER.to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_day_without_lessons() {
        let document = Html::parse_document(GROUP_PAGE);
        let day = extract_day::<GroupLayout>(&document, 3, &page_url(), "114808").unwrap();
        assert_eq!(day.date, "20 февраля 2024, вторник");
        assert!(day.lessons.is_empty());
    }

    #[test]
    fn test_extract_day_unknown_month_is_an_error() {
        let document = Html::parse_document(GROUP_PAGE);
        let err = extract_day::<GroupLayout>(&document, 4, &page_url(), "114808").unwrap_err();
        assert!(matches!(err, ScrapeError::UnknownMonth(_)));
    }

    #[test]
    fn test_extract_day_missing_header_is_an_error() {
        let document = Html::parse_document(GROUP_PAGE);
        let err = extract_day::<GroupLayout>(&document, 5, &page_url(), "114808").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn test_extract_day_stops_at_row_limit() {
        let row = r#"<tr><td data-title="Номер урока">1</td><td data-title="Время">08:30</td></tr>"#;
        let html = format!(
            r#"<div class="raspcontent m5"><div></div><div>
                <div class="panel-heading edu_today"><h2>19 февраля 2024</h2></div>
                <div class="panel-body"><table id="mobile-friendly"><thead><tr><th></th></tr></thead>
                <tbody>{}</tbody></table></div>
            </div></div>"#,
            row.repeat(MAX_ROWS_PER_DAY + 5)
        );
        let document = Html::parse_document(&html);
        let day = extract_day::<GroupLayout>(&document, 2, &page_url(), "1").unwrap();
        assert_eq!(day.lessons.len(), MAX_ROWS_PER_DAY);
    }

    #[test]
    fn test_teacher_day_keeps_rows_after_blank_number() {
        let html = r#"<div class="raspcontent m5"><div>
                <div class="panel-heading edu_today"><h2>20 февраля 2024, вторник</h2></div>
                <div class="panel-body"><table class="table"><thead><tr><th></th></tr></thead>
                <tbody>
                    <tr><td>1</td><td>08:30</td><td>Химия</td></tr>
                    <tr><td> </td><td>09:25</td><td>Биология</td></tr>
                    <tr><td>2</td><td>10:20</td><td>Физика</td></tr>
                </tbody></table></div>
            </div></div>"#;
        let document = Html::parse_document(html);
        let page_url = Url::parse("https://hmtpk.ru/ru/teachers/schedule/").unwrap();
        let day = extract_day::<TeacherLayout>(&document, 1, &page_url, "Иванова И.И.").unwrap();

        let subjects: Vec<&str> = day.lessons.iter().map(|l| l.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Химия", "Биология", "Физика"]);
        assert_eq!(day.lessons[1].number, "");
    }

    #[test]
    fn test_days_ranges() {
        assert_eq!(GroupLayout::days(), 2..=8);
        assert_eq!(TeacherLayout::days(), 1..=7);
    }

    #[test]
    fn test_split_subgroup() {
        assert_eq!(
            split_subgroup("Математика (1)"),
            ("Математика".to_string(), Subgroup::First)
        );
        assert_eq!(
            split_subgroup("Физика (2)"),
            ("Физика".to_string(), Subgroup::Second)
        );
        assert_eq!(
            split_subgroup("Информатика"),
            ("Информатика".to_string(), Subgroup::None)
        );
        assert_eq!(
            split_subgroup("Химия (3)"),
            ("Химия (3)".to_string(), Subgroup::None)
        );
    }

    #[test]
    fn test_schedule_url() {
        let url = schedule_url::<TeacherLayout>(
            &Url::parse("https://hmtpk.ru/ru/teachers/schedule/").unwrap(),
            "Иванова И.И.",
            "22.02.2024",
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("teacher".to_string(), "Иванова И.И.".to_string()));
        assert_eq!(pairs[1], ("date_edu1c".to_string(), "22.02.2024".to_string()));
        assert_eq!(url.path(), "/ru/teachers/schedule/");
    }
}
