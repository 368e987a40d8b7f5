//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Result as SqlResult};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use thiserror::Error;

use super::models::*;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Format used for every stored timestamp. Fixed width, so text order is time order.
const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Read connections opened by `Store::new`.
pub const DEFAULT_READERS: usize = 4;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("connection lock poisoned")]
    Poisoned,
    #[error("at least one read connection is required")]
    NoReaders,
}

/// Thread-safe database store.
///
/// Writes go through a single connection. Reads are spread over a small
/// pool of read-only connections, so concurrent reads on the blocking pool
/// overlap instead of queueing behind one lock. The database runs in WAL
/// mode, which lets readers proceed while a write is in progress.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    readers: Arc<Vec<Mutex<Connection>>>,
    next_reader: Arc<AtomicUsize>,
}

impl Store {
    /// Create a new store with the default read pool.
    #[cfg(test)]
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::with_readers(path, DEFAULT_READERS)
    }

    /// Create a new store with `readers` read-only connections.
    pub fn with_readers<P: AsRef<Path>>(path: P, readers: usize) -> Result<Self, DbError> {
        if readers == 0 {
            return Err(DbError::NoReaders);
        }
        let path = path.as_ref();

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            readers: Arc::new(Vec::new()),
            next_reader: Arc::new(AtomicUsize::new(0)),
        };
        store.init()?;

        // Readers are opened after migrations so they see the final schema.
        let pool = (0..readers)
            .map(|_| {
                let reader = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                Ok(Mutex::new(reader))
            })
            .collect::<SqlResult<Vec<_>>>()?;
        tracing::debug!("Opened {} read connections", pool.len());

        Ok(Self {
            readers: Arc::new(pool),
            ..store
        })
    }

    /// Apply embedded migrations.
    fn init(&self) -> Result<(), DbError> {
        let mut conn = self.conn()?;
        let report = embedded::migrations::runner()
            .run(&mut *conn)
            .map_err(|e| DbError::Migration(e.to_string()))?;

        for m in report.applied_migrations() {
            tracing::info!("Applied migration {}", m);
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Take a free read connection, or wait on one picked round-robin.
    fn reader(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        for slot in self.readers.iter() {
            match slot.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(DbError::Poisoned),
            }
        }

        let i = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[i].lock().map_err(|_| DbError::Poisoned)
    }

    /// Cheap round trip used by the health check.
    pub fn ping(&self) -> Result<(), DbError> {
        let conn = self.reader()?;
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
    }

    // --- Content ---

    /// Count active and total rows of a content category, ignoring time.
    pub fn count_content(&self, category: ContentCategory) -> Result<ActiveTotal, DbError> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) FROM {}",
            category.table()
        );
        let (total, active) = conn.query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(ActiveTotal { active, total })
    }

    /// Get the newest active rows of a content category.
    pub fn list_active_content(
        &self,
        category: ContentCategory,
        limit: usize,
    ) -> Result<Vec<ContentItem>, DbError> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT id, {}, created_at FROM {} \
             WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT ?1",
            category.title_column(),
            category.table()
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let items = rows
            .into_iter()
            .filter_map(|(id, title, time_str)| {
                let created_at = parse_or_skip(category.table(), &time_str)?;
                Some(ContentItem { id, title, created_at })
            })
            .collect();

        Ok(items)
    }

    // --- Records ---

    /// Count records created within `[start, end]`, both ends inclusive.
    pub fn count_in_window(
        &self,
        category: RecordCategory,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE created_at >= ?1 AND created_at <= ?2",
            category.table()
        );
        let count = conn.query_row(
            &sql,
            params![format_db_time(start), format_db_time(end)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Creation times of every record in the given categories within
    /// `[start, end]`, oldest first.
    pub fn created_at_in_window(
        &self,
        categories: &[RecordCategory],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let sql = categories
            .iter()
            .map(|c| {
                format!(
                    "SELECT created_at FROM {} WHERE created_at >= ?1 AND created_at <= ?2",
                    c.table()
                )
            })
            .collect::<Vec<_>>()
            .join(" UNION ALL ")
            + " ORDER BY created_at ASC";

        let conn = self.reader()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params![format_db_time(start), format_db_time(end)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let times = raw
            .iter()
            .filter_map(|s| parse_or_skip("series", s))
            .collect();

        Ok(times)
    }

    /// Get the newest records of a category, newest first.
    pub fn recent(
        &self,
        category: RecordCategory,
        limit: usize,
    ) -> Result<Vec<RecordSummary>, DbError> {
        let (name, email, detail) = category.summary_columns();
        let sql = format!(
            "SELECT id, {}, {}, {}, created_at FROM {} \
             ORDER BY created_at DESC, id DESC LIMIT ?1",
            name,
            email,
            detail,
            category.table()
        );

        let conn = self.reader()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let summaries = rows
            .into_iter()
            .filter_map(|(id, name, email, detail, time_str)| {
                let created_at = parse_or_skip(category.table(), &time_str)?;
                Some(RecordSummary {
                    id,
                    name,
                    email,
                    detail,
                    created_at,
                })
            })
            .collect();

        Ok(summaries)
    }

    /// Persist a public form submission and return its row ID.
    ///
    /// Newsletter signups are keyed by email: a repeated signup re-activates
    /// the existing row and keeps its original creation time.
    pub fn add_submission(
        &self,
        submission: &Submission,
        created_at: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let conn = self.conn()?;
        let ts = format_db_time(created_at);

        match submission {
            Submission::TourBooking(f) => {
                conn.execute(
                    "INSERT INTO tour_bookings
                     (tour_name, name, email, phone, travel_date, travelers, message, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        f.tour_name,
                        f.name,
                        f.email,
                        f.phone,
                        f.travel_date,
                        f.travelers,
                        f.message,
                        ts,
                    ],
                )?;
            }
            Submission::CarRental(f) => {
                conn.execute(
                    "INSERT INTO car_rental_bookings
                     (vehicle_name, name, email, phone, pickup_date, return_date, pickup_location, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        f.vehicle_name,
                        f.name,
                        f.email,
                        f.phone,
                        f.pickup_date,
                        f.return_date,
                        f.pickup_location,
                        ts,
                    ],
                )?;
            }
            Submission::CabBooking(f) => {
                conn.execute(
                    "INSERT INTO cab_bookings
                     (name, email, phone, pickup_location, drop_location, pickup_time, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        f.name,
                        f.email,
                        f.phone,
                        f.pickup_location,
                        f.drop_location,
                        f.pickup_time,
                        ts,
                    ],
                )?;
            }
            Submission::EventRegistration(f) => {
                conn.execute(
                    "INSERT INTO event_registrations
                     (event_title, name, email, phone, attendees, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![f.event_title, f.name, f.email, f.phone, f.attendees, ts],
                )?;
            }
            Submission::AirTravel(f) => {
                conn.execute(
                    "INSERT INTO air_travel_requests
                     (name, email, phone, origin, destination, departure_date, return_date,
                      passengers, travel_class, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        f.name,
                        f.email,
                        f.phone,
                        f.origin,
                        f.destination,
                        f.departure_date,
                        f.return_date,
                        f.passengers,
                        f.travel_class,
                        ts,
                    ],
                )?;
            }
            Submission::Contact(f) => {
                conn.execute(
                    "INSERT INTO contact_inquiries
                     (name, email, phone, subject, message, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![f.name, f.email, f.phone, f.subject, f.message, ts],
                )?;
            }
            Submission::Newsletter(f) => {
                let email = f.email.trim().to_lowercase();
                conn.execute(
                    "INSERT INTO newsletter_subscribers (email, is_active, created_at)
                     VALUES (?1, 1, ?2)
                     ON CONFLICT(email) DO UPDATE SET is_active = 1",
                    params![email, ts],
                )?;
                let id = conn.query_row(
                    "SELECT id FROM newsletter_subscribers WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )?;
                return Ok(id);
            }
        }

        Ok(conn.last_insert_rowid())
    }

    #[cfg(test)]
    pub(crate) fn add_content(
        &self,
        category: ContentCategory,
        title: &str,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {} ({}, is_active, created_at) VALUES (?1, ?2, ?3)",
            category.table(),
            category.title_column()
        );
        conn.execute(&sql, params![title, active, format_db_time(created_at)])?;
        Ok(conn.last_insert_rowid())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    /// Lock every read connection, stalling all reads until the guards drop.
    #[cfg(test)]
    pub(crate) fn lock_readers(&self) -> Vec<MutexGuard<'_, Connection>> {
        self.readers.iter().map(|r| r.lock().unwrap()).collect()
    }

    #[cfg(test)]
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, Connection> {
        self.conn().unwrap()
    }
}

fn format_db_time(t: DateTime<Utc>) -> String {
    t.format(DB_TIME_FORMAT).to_string()
}

/// Parse a stored timestamp, logging and dropping rows that don't parse.
fn parse_or_skip(source: &str, s: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_db_time(s);
    if parsed.is_none() {
        tracing::warn!("Skipping {} row with unparseable created_at {:?}", source, s);
    }
    parsed
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        DB_TIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn contact(name: &str) -> Submission {
        Submission::Contact(ContactForm {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: String::new(),
            subject: format!("Question from {}", name),
            message: "Hello".to_string(),
        })
    }

    #[test]
    fn test_content_counts() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store.add_content(ContentCategory::Tours, "Alps", true, at(2025, 1, 1, 0)).unwrap();
        store.add_content(ContentCategory::Tours, "Fjords", false, at(2025, 1, 2, 0)).unwrap();
        store.add_content(ContentCategory::Faqs, "Refunds?", true, at(2025, 1, 3, 0)).unwrap();

        let tours = store.count_content(ContentCategory::Tours).unwrap();
        assert_eq!(tours, ActiveTotal { active: 1, total: 2 });

        let faqs = store.count_content(ContentCategory::Faqs).unwrap();
        assert_eq!(faqs, ActiveTotal { active: 1, total: 1 });

        // Empty table
        let team = store.count_content(ContentCategory::Team).unwrap();
        assert_eq!(team, ActiveTotal::default());

        let listed = store.list_active_content(ContentCategory::Tours, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Alps");
    }

    #[test]
    fn test_count_in_window_is_inclusive() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let start = at(2025, 3, 8, 0);
        let end = at(2025, 3, 15, 0);

        store.add_submission(&contact("Before"), start - chrono::Duration::nanoseconds(1)).unwrap();
        store.add_submission(&contact("Start"), start).unwrap();
        store.add_submission(&contact("Middle"), at(2025, 3, 10, 12)).unwrap();
        store.add_submission(&contact("End"), end).unwrap();
        store.add_submission(&contact("After"), end + chrono::Duration::seconds(1)).unwrap();

        let count = store
            .count_in_window(RecordCategory::ContactInquiries, start, end)
            .unwrap();
        assert_eq!(count, 3);

        let times = store
            .created_at_in_window(&[RecordCategory::ContactInquiries], start, end)
            .unwrap();
        assert_eq!(times, vec![start, at(2025, 3, 10, 12), end]);
    }

    #[test]
    fn test_created_at_spans_categories() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let cab = Submission::CabBooking(CabBookingForm {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: String::new(),
            pickup_location: "Airport".to_string(),
            drop_location: "Hotel".to_string(),
            pickup_time: String::new(),
        });
        store.add_submission(&cab, at(2025, 3, 12, 9)).unwrap();
        store.add_submission(&contact("Bo"), at(2025, 3, 11, 9)).unwrap();

        let times = store
            .created_at_in_window(
                &[RecordCategory::CabBookings, RecordCategory::ContactInquiries],
                at(2025, 3, 1, 0),
                at(2025, 3, 31, 0),
            )
            .unwrap();
        assert_eq!(times, vec![at(2025, 3, 11, 9), at(2025, 3, 12, 9)]);

        assert!(store
            .created_at_in_window(&[], at(2025, 3, 1, 0), at(2025, 3, 31, 0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_every_record_table_exists() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        for category in RecordCategory::ALL {
            let count = store
                .count_in_window(category, at(2000, 1, 1, 0), at(2100, 1, 1, 0))
                .unwrap();
            assert_eq!(count, 0, "{:?}", category);
            assert!(store.recent(category, 5).unwrap().is_empty());
        }
        for category in ContentCategory::ALL {
            assert_eq!(store.count_content(category).unwrap(), ActiveTotal::default());
        }

        // Reopening the same file must not re-apply migrations.
        drop(store);
        let reopened = Store::new(tmp.path()).unwrap();
        reopened.ping().unwrap();
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        for day in 1..=7 {
            store.add_submission(&contact(&format!("C{}", day)), at(2025, 2, day, 0)).unwrap();
        }

        let recent = store.recent(RecordCategory::ContactInquiries, 5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].name, "C7");
        assert_eq!(recent[4].name, "C3");
        assert_eq!(recent[0].detail, "Question from C7");
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_newsletter_signup_is_idempotent() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let signup = |email: &str| {
            Submission::Newsletter(NewsletterForm {
                email: email.to_string(),
            })
        };

        let first = store.add_submission(&signup("Reader@Example.com"), at(2025, 1, 1, 0)).unwrap();
        let second = store.add_submission(&signup("reader@example.com "), at(2025, 6, 1, 0)).unwrap();
        assert_eq!(first, second);

        let count = store
            .count_in_window(RecordCategory::NewsletterSubscribers, at(2024, 12, 31, 0), at(2025, 1, 2, 0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reads_do_not_wait_on_writer_or_each_other() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::with_readers(tmp.path(), 2).unwrap();
        store.add_submission(&contact("Ivy"), at(2025, 3, 1, 0)).unwrap();

        // Reads complete while the write connection is held.
        let writer = store.lock_writer();
        assert_eq!(store.recent(RecordCategory::ContactInquiries, 5).unwrap().len(), 1);

        // Two read connections can be checked out at once.
        let first = store.reader().unwrap();
        let second = store.reader().unwrap();
        let a: i64 = first.query_row("SELECT COUNT(*) FROM contact_inquiries", [], |r| r.get(0)).unwrap();
        let b: i64 = second.query_row("SELECT COUNT(*) FROM contact_inquiries", [], |r| r.get(0)).unwrap();
        assert_eq!((a, b), (1, 1));
        drop((first, second, writer));

        // Committed writes are visible to the read pool.
        store.add_submission(&contact("Jo"), at(2025, 3, 2, 0)).unwrap();
        let count = store
            .count_in_window(RecordCategory::ContactInquiries, at(2025, 1, 1, 0), at(2025, 12, 31, 0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_store_needs_a_reader() {
        let tmp = NamedTempFile::new().unwrap();
        assert!(matches!(Store::with_readers(tmp.path(), 0), Err(DbError::NoReaders)));
    }

    #[test]
    fn test_unparseable_created_at_is_skipped() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store.add_submission(&contact("Good"), at(2025, 3, 1, 0)).unwrap();
        store
            .execute_batch(
                "INSERT INTO contact_inquiries (name, email, phone, subject, message, created_at)
                 VALUES ('Bad', 'bad@example.com', '', 'x', 'y', 'not a time');
                 INSERT INTO faqs (question, is_active, created_at) VALUES ('Broken?', 1, 'someday');",
            )
            .unwrap();
        store.add_content(ContentCategory::Faqs, "Visas?", true, at(2025, 3, 1, 0)).unwrap();

        let recent = store.recent(RecordCategory::ContactInquiries, 5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name, "Good");

        let listed = store.list_active_content(ContentCategory::Faqs, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Visas?");
    }

    #[test]
    fn test_parse_db_time() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 12, 8, 30, 0).unwrap();
        assert_eq!(parse_db_time("2025-03-12 08:30:00.000000000"), Some(expected));
        assert_eq!(parse_db_time("2025-03-12 08:30:00"), Some(expected));
        assert_eq!(parse_db_time("2025-03-12T08:30:00Z"), Some(expected));
        assert_eq!(parse_db_time("2025-03-12T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_db_time("yesterday"), None);
    }
}
