use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use scraper::Html;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use crate::announce::{ANNOUNCE_PATH, parse_announcements_page};
use crate::cache::{Cache, CacheTtl, announcements_key};
use crate::dates::{format_request_date, parse_request_date, week_cache_key};
use crate::models::{AnnouncementsPage, ScheduleOption, WeekSchedule};
use crate::options::extract_options;
use crate::schedule::{GroupLayout, ScheduleLayout, TeacherLayout, extract_week, schedule_url};
use crate::validation::{validate_label, validate_page};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Date {0:?} must be in dd.mm.yyyy format")]
    DateParse(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Request cancelled before the site responded")]
    Cancelled,
    #[error("Background fetch failed: {0}")]
    Background(#[from] tokio::task::JoinError),
    #[error("Unexpected page structure: {0}")]
    Parse(String),
    #[error("Unrecognized month in date {0:?}")]
    UnknownMonth(String),
}

/// Entry point for everything read from the college site.
///
/// Each operation makes at most one request to the site. Results are cached
/// by week (schedules), by kind (option lists) or by page (announcements).
#[derive(Clone)]
pub struct HmtpkScraper {
    client: reqwest::Client,
    base_url: Arc<Url>,
    cache: Arc<dyn Cache>,
    ttl: CacheTtl,
}

impl HmtpkScraper {
    pub fn new(base_url: Url, cache: Arc<dyn Cache>, ttl: CacheTtl) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::new(base_url),
            cache,
            ttl,
        }
    }

    /// Week containing `date` (`dd.mm.yyyy`) for a group id.
    pub async fn schedule_by_group(
        &self,
        group: &str,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<WeekSchedule, ScrapeError> {
        self.schedule::<GroupLayout>(group, date, cancel).await
    }

    /// Week containing `date` (`dd.mm.yyyy`) for a teacher's full name.
    pub async fn schedule_by_teacher(
        &self,
        teacher: &str,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<WeekSchedule, ScrapeError> {
        self.schedule::<TeacherLayout>(teacher, date, cancel).await
    }

    pub async fn group_options(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScheduleOption>, ScrapeError> {
        let this = self.clone();
        run_cancellable(cancel, async move { this.fetch_options::<GroupLayout>().await }).await
    }

    pub async fn teacher_options(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScheduleOption>, ScrapeError> {
        let this = self.clone();
        run_cancellable(cancel, async move { this.fetch_options::<TeacherLayout>().await }).await
    }

    pub async fn announcements(
        &self,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<AnnouncementsPage, ScrapeError> {
        let page = validate_page(page)?;
        let this = self.clone();
        run_cancellable(cancel, async move { this.fetch_announcements(page).await }).await
    }

    async fn schedule<L: ScheduleLayout>(
        &self,
        label: &str,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<WeekSchedule, ScrapeError> {
        let label = validate_label(label)?.to_string();
        let date = parse_request_date(date)?;
        let this = self.clone();
        run_cancellable(cancel, async move { this.fetch_week::<L>(&label, date).await }).await
    }

    async fn fetch_week<L: ScheduleLayout>(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<WeekSchedule, ScrapeError> {
        let key = week_cache_key(date, label);
        if let Some(week) = self.cached::<WeekSchedule>(&key).await {
            return Ok(week);
        }

        let page_url = self.base_url.join(L::PAGE_PATH)?;
        let url = schedule_url::<L>(&page_url, label, &format_request_date(date));
        let html = self.fetch_html(&url).await?;
        let week = {
            let document = Html::parse_document(&html);
            extract_week::<L>(&document, &page_url, label)?
        };

        self.store(&key, &week, self.ttl.schedule).await;
        Ok(week)
    }

    async fn fetch_options<L: ScheduleLayout>(&self) -> Result<Vec<ScheduleOption>, ScrapeError> {
        let key = L::OPTIONS_CACHE_KEY;
        if let Some(options) = self
            .cached::<Vec<ScheduleOption>>(key)
            .await
            .filter(|options| !options.is_empty())
        {
            return Ok(options);
        }

        let url = self.base_url.join(L::PAGE_PATH)?;
        let html = self.fetch_html(&url).await?;
        let options = extract_options::<L>(&Html::parse_document(&html));

        if !options.is_empty() {
            self.store(key, &options, self.ttl.listing).await;
        }
        Ok(options)
    }

    async fn fetch_announcements(&self, page: u32) -> Result<AnnouncementsPage, ScrapeError> {
        let key = announcements_key(page);
        if let Some(cached) = self.cached::<AnnouncementsPage>(&key).await {
            return Ok(cached);
        }

        let mut url = self.base_url.join(ANNOUNCE_PATH)?;
        url.query_pairs_mut()
            .append_pair("PAGEN_1", &page.to_string());
        let html = self.fetch_html(&url).await?;
        let announcements = parse_announcements_page(&html)?;

        self.store(&key, &announcements, self.ttl.listing).await;
        Ok(announcements)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, ScrapeError> {
        debug!(%url, "fetching page");
        let response = self
            .client
            .post(url.as_str())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(body)
    }

    /// Cache problems only ever turn into a miss.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "served from cache");
                Some(value)
            }
            Err(err) => {
                warn!(key, error = %err, "ignoring undecodable cache entry");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                error!(key, error = %err, "failed to serialize cache entry");
                return;
            }
        };

        match self.cache.set(key, &payload, ttl).await {
            Ok(()) => debug!(key, "stored in cache"),
            Err(err) => error!(key, error = %err, "cache write failed"),
        }
    }
}

/// Runs `work` on its own task and stops waiting once `cancel` fires.
///
/// The task itself is not aborted: an in-flight request runs to completion in
/// the background and its result is dropped.
async fn run_cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T, ScrapeError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ScrapeError>> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(ScrapeError::Cancelled);
    }

    let task = tokio::spawn(work);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("stopped waiting for the site, request continues in background");
            Err(ScrapeError::Cancelled)
        }
        joined = task => joined?,
    }
}
