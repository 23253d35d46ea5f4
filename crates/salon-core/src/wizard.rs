//! Three-step booking form.
//!
//! The wizard moves `Contact -> Schedule -> Services`. Moving forward is
//! gated on the fields collected so far; jumping back to `Contact` is
//! always allowed. Submitting validates everything again, joins the
//! selected services into one field and hands the booking to a
//! [`BookingSubmitter`]. A successful submit clears the form and returns to
//! `Contact`; a failed one leaves the wizard where it was.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use salon_db::models::{Booking, NewBooking};

use crate::booking::{BookingRequest, BookingService};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Separator used when several services are selected.
pub const SERVICE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    /// Name, email and phone.
    Contact,
    /// Preferred date and time.
    Schedule,
    /// Service selection and submit.
    Services,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            Self::Contact => 1,
            Self::Schedule => 2,
            Self::Services => 3,
        }
    }
}

/// Why the wizard refused to move forward or submit. The messages are the
/// ones shown to the person filling in the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Please enter your full name.")]
    MissingName,

    #[error("Please enter your email address.")]
    MissingEmail,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Please enter your phone number.")]
    MissingPhone,

    #[error("Please select a preferred date.")]
    MissingDate,

    #[error("Please select a valid date (YYYY-MM-DD), got {0:?}.")]
    InvalidDate(String),

    #[error("Please select a date that is today or in the future.")]
    PastDate,

    #[error("Please select a preferred time.")]
    MissingTime,

    #[error("Please select at least one service.")]
    NoServices,

    #[error("Error: {0}")]
    Rejected(String),
}

/// Anything that can accept a finished booking and return the stored record.
#[async_trait]
pub trait BookingSubmitter: Send + Sync {
    async fn submit(&self, booking: &NewBooking) -> anyhow::Result<Booking>;
}

#[async_trait]
impl BookingSubmitter for BookingService {
    async fn submit(&self, booking: &NewBooking) -> anyhow::Result<Booking> {
        Ok(self.book(BookingRequest::from(booking.clone())).await?)
    }
}

/// Raw field values as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// `YYYY-MM-DD`, as produced by a date input.
    pub date: String,
    pub time: String,
    /// Checked services, in the order they were checked.
    pub services: Vec<String>,
}

impl BookingForm {
    /// Check a service box. Checking an already checked service is a no-op.
    pub fn select_service(&mut self, service: impl Into<String>) {
        let service = service.into();
        if !self.services.contains(&service) {
            self.services.push(service);
        }
    }

    pub fn deselect_service(&mut self, service: &str) {
        self.services.retain(|s| s != service);
    }

    fn check_contact(&self) -> Result<(), WizardError> {
        if self.name.trim().is_empty() {
            return Err(WizardError::MissingName);
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(WizardError::MissingEmail);
        }
        if !EMAIL_RE.is_match(email) {
            return Err(WizardError::InvalidEmail);
        }
        if self.phone.trim().is_empty() {
            return Err(WizardError::MissingPhone);
        }
        Ok(())
    }

    fn check_schedule(&self, today: NaiveDate) -> Result<(), WizardError> {
        let raw = self.date.trim();
        if raw.is_empty() {
            return Err(WizardError::MissingDate);
        }
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| WizardError::InvalidDate(raw.to_owned()))?;
        if date < today {
            return Err(WizardError::PastDate);
        }
        if self.time.trim().is_empty() {
            return Err(WizardError::MissingTime);
        }
        Ok(())
    }

    fn joined_services(&self) -> Result<String, WizardError> {
        let selected: Vec<&str> = self
            .services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if selected.is_empty() {
            return Err(WizardError::NoServices);
        }
        Ok(selected.join(SERVICE_SEPARATOR))
    }
}

/// The booking form state machine.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: WizardStep,
    pub form: BookingForm,
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Contact,
            form: BookingForm::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Jump back to the first step. Never fails and keeps the form contents.
    pub fn back_to_contact(&mut self) {
        self.step = WizardStep::Contact;
    }

    /// Move to the date/time step once the contact details are valid.
    pub fn to_schedule(&mut self) -> Result<(), WizardError> {
        self.form.check_contact()?;
        self.step = WizardStep::Schedule;
        Ok(())
    }

    /// Move to the service step once contact details and schedule are valid.
    /// `today` is the local calendar date; time of day plays no part.
    pub fn to_services(&mut self, today: NaiveDate) -> Result<(), WizardError> {
        self.form.check_contact()?;
        self.form.check_schedule(today)?;
        self.step = WizardStep::Services;
        Ok(())
    }

    /// The booking that would be sent, after checking every step.
    pub fn submission(&self, today: NaiveDate) -> Result<NewBooking, WizardError> {
        self.form.check_contact()?;
        self.form.check_schedule(today)?;
        let service = self.form.joined_services()?;

        Ok(NewBooking {
            name: self.form.name.trim().to_owned(),
            email: self.form.email.trim().to_owned(),
            phone: self.form.phone.trim().to_owned(),
            date: self.form.date.trim().to_owned(),
            time: self.form.time.trim().to_owned(),
            service,
            message: String::new(),
        })
    }

    /// Validate and send the booking.
    ///
    /// On success the form is cleared, the wizard returns to
    /// [`WizardStep::Contact`] and the stored booking is returned as the
    /// receipt. On failure nothing changes.
    pub async fn submit(
        &mut self,
        submitter: &dyn BookingSubmitter,
        today: NaiveDate,
    ) -> Result<Booking, WizardError> {
        let booking = self.submission(today)?;
        debug!(step = self.step.number(), "submitting booking");

        let stored = submitter
            .submit(&booking)
            .await
            .map_err(|e| WizardError::Rejected(format!("{e:#}")))?;

        self.reset();
        Ok(stored)
    }

    /// Clear every field and return to the first step.
    pub fn reset(&mut self) {
        self.form = BookingForm::default();
        self.step = WizardStep::Contact;
    }
}
