use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{ScheduleLayout, nth_child, split_subgroup};
use crate::cache::TEACHERS_KEY;
use crate::models::Lesson;

const COLUMNS: usize = 5;

static OPTIONS: Lazy<Selector> = Lazy::new(|| {
    // the second option is a placeholder entry
    Selector::parse("#zstfiltr > div > div:nth-child(1) > select > option[value]:not(:nth-child(2))")
        .expect("valid selector")
});

// ASCII non-word character, hyphen, up to three digits: "А-12", " -5"
static ROOM_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_]-[0-9]{1,3}$").expect("regex compiles"));

/// Teacher view. Columns are positional:
/// number, time, subject, group, room with location.
pub struct TeacherLayout;

impl ScheduleLayout for TeacherLayout {
    const PAGE_PATH: &'static str = "ru/teachers/schedule/";
    const QUERY_PARAM: &'static str = "teacher";
    const OPTIONS_CACHE_KEY: &'static str = TEACHERS_KEY;
    const FIRST_DAY: usize = 1;

    fn lessons_selector(day: usize) -> String {
        format!(
            "div.raspcontent.m5 div:nth-child({day}) div.panel-body > table.table > tbody:nth-child(2)"
        )
    }

    fn options_selector() -> &'static Selector {
        &OPTIONS
    }

    fn extract_lesson(row: ElementRef<'_>, _previous_number: &str) -> Option<Lesson> {
        let mut lesson = Lesson::default();

        for position in 1..=COLUMNS {
            // only a cell with no text at all counts as missing; whitespace is a value
            let raw = nth_child(row, position, "td")
                .map(|cell| cell.text().collect::<String>())
                .unwrap_or_default();
            if raw.is_empty() {
                if position == 1 {
                    return None;
                }
                continue;
            }
            let value = clean_cell(&raw);

            match position {
                1 => lesson.number = value,
                2 => lesson.time = value,
                3 => {
                    let (subject, subgroup) = split_subgroup(&value);
                    lesson.subject = subject;
                    lesson.subgroup = subgroup;
                }
                4 => lesson.group = value,
                _ => {
                    let (room, location) = split_room(&value);
                    lesson.room = room;
                    lesson.location = location;
                }
            }
        }

        Some(lesson)
    }
}

fn clean_cell(raw: &str) -> String {
    raw.replace('\n', "").trim().to_string()
}

/// Splits `"Корпус А-12"` into room `"А-12"` and location `"Корпус"`.
///
/// The location is right-trimmed of every character that occurs in the room,
/// not of the room text as a unit, so `"Зал1-А-1"` leaves `"Зал"`.
pub fn split_room(value: &str) -> (String, String) {
    let value = value.trim();
    match ROOM_SUFFIX.find(value) {
        Some(found) => {
            let room = found.as_str().trim();
            let location = value.trim_end_matches(|c: char| room.contains(c)).trim();
            (room.to_string(), location.to_string())
        }
        None => (value.to_string(), String::new()),
    }
}
