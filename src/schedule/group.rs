use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use super::{ScheduleLayout, element_text, nth_child, split_subgroup};
use crate::cache::GROUPS_KEY;
use crate::models::Lesson;

const COLUMNS: usize = 5;

static OPTIONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#group > option[value]").expect("valid selector"));

/// Student group view. Every cell names its column in `data-title`.
pub struct GroupLayout;

impl ScheduleLayout for GroupLayout {
    const PAGE_PATH: &'static str = "ru/students/schedule/";
    const QUERY_PARAM: &'static str = "group";
    const OPTIONS_CACHE_KEY: &'static str = GROUPS_KEY;
    // the first child of the container is an extra wrapper
    const FIRST_DAY: usize = 2;

    fn lessons_selector(day: usize) -> String {
        format!(
            "div.raspcontent.m5 div:nth-child({day}) div.panel-body > #mobile-friendly > tbody:nth-child(2)"
        )
    }

    fn options_selector() -> &'static Selector {
        &OPTIONS
    }

    fn extract_lesson(row: ElementRef<'_>, previous_number: &str) -> Option<Lesson> {
        let mut lesson = Lesson::default();

        for position in 1..=COLUMNS {
            let Some((cell, title)) = nth_child(row, position, "td")
                .and_then(|cell| cell.value().attr("data-title").map(|title| (cell, title)))
            else {
                match position {
                    1 => return None,
                    COLUMNS => break,
                    _ => continue,
                }
            };

            let text = element_text(cell);
            match title {
                "Номер урока" => lesson.number = text,
                "Время" => {
                    // continuation rows of a lesson block carry only the time
                    if lesson.number.is_empty() {
                        lesson.number = previous_number.to_string();
                    }
                    lesson.time = text;
                }
                "Название предмета" => {
                    let (subject, subgroup) = split_subgroup(&text);
                    lesson.subject = subject;
                    lesson.subgroup = subgroup;
                }
                "Кабинет" => lesson.room = text,
                "Преподаватель" => lesson.teacher = text,
                _ => {}
            }
        }

        Some(lesson)
    }
}
