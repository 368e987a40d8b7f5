//! Validation of public form submissions.

use crate::db::Submission;

use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn require(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), String> {
    if !email_pattern().is_match(email.trim()) {
        return Err("a valid email is required".to_string());
    }
    Ok(())
}

fn require_positive(n: i64, field: &str) -> Result<(), String> {
    if n < 1 {
        return Err(format!("{} must be at least 1", field));
    }
    Ok(())
}

/// Check the required fields of a submission before it is stored.
pub fn validate_submission(submission: &Submission) -> Result<(), String> {
    match submission {
        Submission::TourBooking(f) => {
            require(&f.tour_name, "tourName")?;
            require(&f.name, "name")?;
            require_email(&f.email)?;
            require_positive(f.travelers, "travelers")
        }
        Submission::CarRental(f) => {
            require(&f.vehicle_name, "vehicleName")?;
            require(&f.name, "name")?;
            require_email(&f.email)
        }
        Submission::CabBooking(f) => {
            require(&f.name, "name")?;
            require_email(&f.email)?;
            require(&f.pickup_location, "pickupLocation")?;
            require(&f.drop_location, "dropLocation")
        }
        Submission::EventRegistration(f) => {
            require(&f.event_title, "eventTitle")?;
            require(&f.name, "name")?;
            require_email(&f.email)?;
            require_positive(f.attendees, "attendees")
        }
        Submission::AirTravel(f) => {
            require(&f.name, "name")?;
            require_email(&f.email)?;
            require(&f.origin, "origin")?;
            require(&f.destination, "destination")?;
            require_positive(f.passengers, "passengers")
        }
        Submission::Contact(f) => {
            require(&f.name, "name")?;
            require_email(&f.email)?;
            require(&f.message, "message")
        }
        Submission::Newsletter(f) => require_email(&f.email),
    }
}
