//! Dashboard statistics.
//!
//! Turns a range selector into one [`DateWindow`], runs every read the
//! dashboard needs against that same window concurrently, and assembles the
//! counts, chart series and recent-activity lists into a single response.

mod series;
mod window;

pub use series::*;
pub use window::*;

use crate::db::{ActiveTotal, ContentCategory, DbError, RecordCategory, RecordSummary, Store};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Aggregation error types.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("data source error: {0}")]
    DataSource(#[from] DbError),
    #[error("query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("aggregation timed out after {0:?}")]
    Timeout(Duration),
}

/// Unwindowed active/total counts per content category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentCounts {
    pub tours: ActiveTotal,
    pub vehicles: ActiveTotal,
    pub events: ActiveTotal,
    pub blogs: ActiveTotal,
    pub testimonials: ActiveTotal,
    pub team: ActiveTotal,
    pub faqs: ActiveTotal,
    pub images: ActiveTotal,
}

/// Record counts inside the request window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCounts {
    pub tour_bookings: i64,
    pub car_rental_bookings: i64,
    pub cab_bookings: i64,
    pub event_registrations: i64,
    pub air_travel_requests: i64,
    pub inquiries: i64,
    pub newsletter_subscribers: i64,
    /// Sum of the booking-like categories in [`RecordCategory::BOOKINGS`].
    pub total_bookings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub bookings_by_period: Vec<Bucket>,
    pub inquiries_by_period: Vec<Bucket>,
}

/// Latest records per category, independent of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub tour_bookings: Vec<RecordSummary>,
    pub car_rental_bookings: Vec<RecordSummary>,
    pub cab_bookings: Vec<RecordSummary>,
    pub event_registrations: Vec<RecordSummary>,
    pub inquiries: Vec<RecordSummary>,
}

/// Body of a successful dashboard-stats response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub success: bool,
    pub range: RangeSelector,
    #[serde(flatten)]
    pub window: DateWindow,
    pub content: ContentCounts,
    pub period: PeriodCounts,
    pub chart: ChartSeries,
    pub recent: RecentActivity,
}

/// Run one blocking store read on the blocking pool.
async fn read<T, F>(store: &Arc<Store>, f: F) -> Result<T, StatsError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, DbError> + Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || f(&*store)).await??)
}

async fn content_counts(store: &Arc<Store>) -> Result<ContentCounts, StatsError> {
    let count = |c: ContentCategory| read(store, move |s: &Store| s.count_content(c));

    let (tours, vehicles, events, blogs, testimonials, team, faqs, images) = tokio::try_join!(
        count(ContentCategory::Tours),
        count(ContentCategory::Vehicles),
        count(ContentCategory::Events),
        count(ContentCategory::Blogs),
        count(ContentCategory::Testimonials),
        count(ContentCategory::Team),
        count(ContentCategory::Faqs),
        count(ContentCategory::Images),
    )?;

    Ok(ContentCounts {
        tours,
        vehicles,
        events,
        blogs,
        testimonials,
        team,
        faqs,
        images,
    })
}

async fn period_counts(store: &Arc<Store>, window: DateWindow) -> Result<PeriodCounts, StatsError> {
    let count = |c: RecordCategory| {
        read(store, move |s: &Store| s.count_in_window(c, window.start, window.end))
    };

    let (
        tour_bookings,
        car_rental_bookings,
        cab_bookings,
        event_registrations,
        air_travel_requests,
        inquiries,
        newsletter_subscribers,
    ) = tokio::try_join!(
        count(RecordCategory::TourBookings),
        count(RecordCategory::CarRentalBookings),
        count(RecordCategory::CabBookings),
        count(RecordCategory::EventRegistrations),
        count(RecordCategory::AirTravelRequests),
        count(RecordCategory::ContactInquiries),
        count(RecordCategory::NewsletterSubscribers),
    )?;

    Ok(PeriodCounts {
        tour_bookings,
        car_rental_bookings,
        cab_bookings,
        event_registrations,
        air_travel_requests,
        inquiries,
        newsletter_subscribers,
        total_bookings: tour_bookings + car_rental_bookings + cab_bookings + air_travel_requests,
    })
}

async fn recent_activity(store: &Arc<Store>, limit: usize) -> Result<RecentActivity, StatsError> {
    let recent = |c: RecordCategory| read(store, move |s: &Store| s.recent(c, limit));

    let (tour_bookings, car_rental_bookings, cab_bookings, event_registrations, inquiries) =
        tokio::try_join!(
            recent(RecordCategory::TourBookings),
            recent(RecordCategory::CarRentalBookings),
            recent(RecordCategory::CabBookings),
            recent(RecordCategory::EventRegistrations),
            recent(RecordCategory::ContactInquiries),
        )?;

    Ok(RecentActivity {
        tour_bookings,
        car_rental_bookings,
        cab_bookings,
        event_registrations,
        inquiries,
    })
}

/// Build the dashboard statistics for `range` as seen at `now`.
///
/// The window is computed once; every sub-query runs against it. The first
/// failing sub-query fails the whole aggregation.
pub async fn aggregate(
    store: &Arc<Store>,
    range: RangeSelector,
    now: DateTime<Utc>,
    recent_limit: usize,
) -> Result<DashboardStats, StatsError> {
    let window = DateWindow::compute(range, now);
    let started = Instant::now();

    let (content, period, recent, booking_times, inquiry_times) = tokio::try_join!(
        content_counts(store),
        period_counts(store, window),
        recent_activity(store, recent_limit),
        read(store, move |s: &Store| {
            s.created_at_in_window(&RecordCategory::BOOKINGS, window.start, window.end)
        }),
        read(store, move |s: &Store| {
            s.created_at_in_window(&[RecordCategory::ContactInquiries], window.start, window.end)
        }),
    )?;

    let chart = ChartSeries {
        bookings_by_period: build_series(&booking_times, &window, range),
        inquiries_by_period: build_series(&inquiry_times, &window, range),
    };

    tracing::debug!(
        "Aggregated {} stats for {} .. {} in {:?}",
        range.as_str(),
        window.start,
        window.end,
        started.elapsed()
    );

    Ok(DashboardStats {
        success: true,
        range,
        window,
        content,
        period,
        chart,
        recent,
    })
}

/// [`aggregate`] bounded by an optional deadline.
pub async fn aggregate_within(
    store: &Arc<Store>,
    range: RangeSelector,
    now: DateTime<Utc>,
    recent_limit: usize,
    limit: Option<Duration>,
) -> Result<DashboardStats, StatsError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, aggregate(store, range, now, recent_limit))
            .await
            .map_err(|_| StatsError::Timeout(limit))?,
        None => aggregate(store, range, now, recent_limit).await,
    }
}
