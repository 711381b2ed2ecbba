use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::models::{Announcement, AnnouncementsPage};
use crate::schedule::element_text;
use crate::scraper::ScrapeError;

pub const ANNOUNCE_PATH: &str = "ru/press-center/announce";

static LISTING: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "section.sf-pagewrap-area.overflow-hidden.d-flex.flex-col.justify-content-start > div > section > main > section > div > div.row",
    )
    .expect("valid selector")
});
static ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.iblock-list-item-text.p-3").expect("valid selector"));
static DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.c-text-secondary").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 > a").expect("valid selector"));
static BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.c-text-secondary").expect("valid selector"));
static PAGINATION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("main div.sf-viewbox.position-relative > div:last-child > *")
        .expect("valid selector")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("regex compiles"));

pub fn parse_announcements_page(html: &str) -> Result<AnnouncementsPage, ScrapeError> {
    let document = Html::parse_document(html);
    Ok(AnnouncementsPage {
        announcements: extract_announcements(&document),
        last_page: extract_last_page(&document)?,
    })
}

/// Blocks that fail to parse are logged and left out.
pub fn extract_announcements(document: &Html) -> Vec<Announcement> {
    let Some(listing) = document.select(&LISTING).next() else {
        return Vec::new();
    };

    listing
        .select(&ITEM)
        .filter_map(|item| {
            extract_announcement(item)
                .map_err(|err| warn!(error = %err, "skipping announcement block"))
                .ok()
        })
        .collect()
}

fn extract_announcement(item: ElementRef<'_>) -> Result<Announcement, ScrapeError> {
    let date = item
        .select(&DATE)
        .next()
        .map(element_text)
        .filter(|date| !date.is_empty())
        .ok_or_else(|| ScrapeError::Parse("announcement date not found".into()))?;

    let link = item
        .select(&TITLE_LINK)
        .next()
        .ok_or_else(|| ScrapeError::Parse("announcement title not found".into()))?;
    let path = link
        .value()
        .attr("href")
        .ok_or_else(|| ScrapeError::Parse("announcement path not found".into()))?
        .trim()
        .to_string();
    let title = collapse_whitespace(&link.text().collect::<Vec<_>>().join(""));

    let body = item
        .select(&BODY)
        .next()
        .map(|body| collapse_whitespace(&body.inner_html()))
        .filter(|body| !body.is_empty())
        .ok_or_else(|| ScrapeError::Parse("announcement body not found".into()))?;

    Ok(Announcement {
        path,
        title,
        date,
        body,
    })
}

fn collapse_whitespace(html: &str) -> String {
    WHITESPACE.replace_all(html, " ").trim().to_string()
}

/// The pager ends either with the last page number or with a "next" arrow
/// that follows it.
pub fn extract_last_page(document: &Html) -> Result<u32, ScrapeError> {
    let elements: Vec<ElementRef<'_>> = document.select(&PAGINATION).collect();
    let (last, rest) = elements
        .split_last()
        .ok_or_else(|| ScrapeError::Parse("pagination not found".into()))?;

    let page_element = if last.value().name() == "span" {
        last
    } else {
        rest.last()
            .ok_or_else(|| ScrapeError::Parse("pagination has no page number".into()))?
    };

    let text = element_text(*page_element);
    text.parse()
        .map_err(|_| ScrapeError::Parse(format!("invalid page number {text:?}")))
}
