use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use salon_core::wizard::{BookingSubmitter, BookingWizard};
use salon_db::models::Booking;

use crate::client::HttpSubmitter;

/// Field values collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct BookArgs {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub services: Vec<String>,
}

/// Walk the wizard through every step with `args` and submit the result.
///
/// Each step is validated as it is reached so the first problem is the
/// one reported, the same order a person filling in the form would see.
pub async fn fill_and_submit(
    args: BookArgs,
    submitter: &dyn BookingSubmitter,
    today: NaiveDate,
) -> Result<Booking> {
    let mut wizard = BookingWizard::new();

    wizard.form.name = args.name;
    wizard.form.email = args.email;
    wizard.form.phone = args.phone;
    wizard.to_schedule()?;

    wizard.form.date = args.date;
    wizard.form.time = args.time;
    wizard.to_services(today)?;

    for service in args.services {
        wizard.form.select_service(service);
    }
    Ok(wizard.submit(submitter, today).await?)
}

pub async fn run_book(server: &str, args: BookArgs) -> Result<()> {
    let submitter = HttpSubmitter::new(server);
    match submitter.maintenance_enabled().await {
        Ok(true) => eprintln!("Note: the site is in maintenance mode; your booking may be delayed."),
        Ok(false) => {}
        Err(e) => warn!(error = %format!("{e:#}"), "could not check maintenance mode"),
    }
    let today = chrono::Local::now().date_naive();
    let booking = fill_and_submit(args, &submitter, today).await?;

    println!("Booking confirmed.");
    println!("  id:      {}", booking.id);
    println!("  name:    {}", booking.name);
    println!("  when:    {} {}", booking.date, booking.time);
    println!("  service: {}", booking.service);
    println!("We'll contact you at {} to confirm.", booking.email);
    Ok(())
}
