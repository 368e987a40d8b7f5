//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kind of record submitted through the public forms.
///
/// Every variant maps to one table carrying a `created_at` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCategory {
    TourBookings,
    CarRentalBookings,
    CabBookings,
    EventRegistrations,
    AirTravelRequests,
    ContactInquiries,
    NewsletterSubscribers,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 7] = [
        RecordCategory::TourBookings,
        RecordCategory::CarRentalBookings,
        RecordCategory::CabBookings,
        RecordCategory::EventRegistrations,
        RecordCategory::AirTravelRequests,
        RecordCategory::ContactInquiries,
        RecordCategory::NewsletterSubscribers,
    ];

    /// Categories merged into the combined bookings series and total.
    pub const BOOKINGS: [RecordCategory; 4] = [
        RecordCategory::TourBookings,
        RecordCategory::CarRentalBookings,
        RecordCategory::CabBookings,
        RecordCategory::AirTravelRequests,
    ];

    pub fn table(self) -> &'static str {
        match self {
            RecordCategory::TourBookings => "tour_bookings",
            RecordCategory::CarRentalBookings => "car_rental_bookings",
            RecordCategory::CabBookings => "cab_bookings",
            RecordCategory::EventRegistrations => "event_registrations",
            RecordCategory::AirTravelRequests => "air_travel_requests",
            RecordCategory::ContactInquiries => "contact_inquiries",
            RecordCategory::NewsletterSubscribers => "newsletter_subscribers",
        }
    }

    /// SQL expressions for the (name, email, detail) columns of a summary row.
    pub(crate) fn summary_columns(self) -> (&'static str, &'static str, &'static str) {
        match self {
            RecordCategory::TourBookings => ("name", "email", "tour_name"),
            RecordCategory::CarRentalBookings => ("name", "email", "vehicle_name"),
            RecordCategory::CabBookings => ("name", "email", "pickup_location || ' -> ' || drop_location"),
            RecordCategory::EventRegistrations => ("name", "email", "event_title"),
            RecordCategory::AirTravelRequests => ("name", "email", "origin || ' -> ' || destination"),
            RecordCategory::ContactInquiries => ("name", "email", "subject"),
            RecordCategory::NewsletterSubscribers => ("''", "email", "''"),
        }
    }
}

/// A kind of content managed from the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Tours,
    Vehicles,
    Events,
    Blogs,
    Testimonials,
    Team,
    Faqs,
    Images,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 8] = [
        ContentCategory::Tours,
        ContentCategory::Vehicles,
        ContentCategory::Events,
        ContentCategory::Blogs,
        ContentCategory::Testimonials,
        ContentCategory::Team,
        ContentCategory::Faqs,
        ContentCategory::Images,
    ];

    pub fn table(self) -> &'static str {
        match self {
            ContentCategory::Tours => "tours",
            ContentCategory::Vehicles => "vehicles",
            ContentCategory::Events => "events",
            ContentCategory::Blogs => "blogs",
            ContentCategory::Testimonials => "testimonials",
            ContentCategory::Team => "team_members",
            ContentCategory::Faqs => "faqs",
            ContentCategory::Images => "gallery_images",
        }
    }

    /// Column holding the human-readable headline of a row.
    pub(crate) fn title_column(self) -> &'static str {
        match self {
            ContentCategory::Tours
            | ContentCategory::Events
            | ContentCategory::Blogs
            | ContentCategory::Images => "title",
            ContentCategory::Vehicles | ContentCategory::Testimonials | ContentCategory::Team => "name",
            ContentCategory::Faqs => "question",
        }
    }

    /// URL slug used by the public listing routes.
    pub fn slug(self) -> &'static str {
        match self {
            ContentCategory::Tours => "tours",
            ContentCategory::Vehicles => "vehicles",
            ContentCategory::Events => "events",
            ContentCategory::Blogs => "blogs",
            ContentCategory::Testimonials => "testimonials",
            ContentCategory::Team => "team",
            ContentCategory::Faqs => "faqs",
            ContentCategory::Images => "images",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

/// Active and total row counts for one content category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActiveTotal {
    pub active: i64,
    pub total: i64,
}

/// Short view of a submitted record, used for "recent activity" lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// A public listing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

// --- Public form payloads ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourBookingForm {
    pub tour_name: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub travel_date: String,
    #[serde(default = "one")]
    pub travelers: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRentalForm {
    pub vehicle_name: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub pickup_date: String,
    #[serde(default)]
    pub return_date: String,
    #[serde(default)]
    pub pickup_location: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabBookingForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub pickup_location: String,
    pub drop_location: String,
    #[serde(default)]
    pub pickup_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistrationForm {
    pub event_title: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "one")]
    pub attendees: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirTravelForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub departure_date: String,
    #[serde(default)]
    pub return_date: String,
    #[serde(default = "one")]
    pub passengers: i64,
    #[serde(default = "economy")]
    pub travel_class: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsletterForm {
    pub email: String,
}

fn one() -> i64 {
    1
}

fn economy() -> String {
    "economy".to_string()
}

/// A validated-or-not public form submission, tagged by its target table.
#[derive(Debug, Clone)]
pub enum Submission {
    TourBooking(TourBookingForm),
    CarRental(CarRentalForm),
    CabBooking(CabBookingForm),
    EventRegistration(EventRegistrationForm),
    AirTravel(AirTravelForm),
    Contact(ContactForm),
    Newsletter(NewsletterForm),
}

impl Submission {
    pub fn category(&self) -> RecordCategory {
        match self {
            Submission::TourBooking(_) => RecordCategory::TourBookings,
            Submission::CarRental(_) => RecordCategory::CarRentalBookings,
            Submission::CabBooking(_) => RecordCategory::CabBookings,
            Submission::EventRegistration(_) => RecordCategory::EventRegistrations,
            Submission::AirTravel(_) => RecordCategory::AirTravelRequests,
            Submission::Contact(_) => RecordCategory::ContactInquiries,
            Submission::Newsletter(_) => RecordCategory::NewsletterSubscribers,
        }
    }
}
