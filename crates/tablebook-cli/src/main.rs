//! # Tablebook CLI
//!
//! Command-line front end for the booking orchestrator.
//!
//! | Variable                 | Default                     | Description                |
//! |--------------------------|-----------------------------|----------------------------|
//! | `TABLEBOOK_BASE_URL`     | `http://localhost:4000/api` | Booking service base URL   |
//! | `TABLEBOOK_TIMEOUT_SECS` | none                        | Per-request timeout        |
//! | `RUST_LOG`               | `tablebook=info`            | Log filter                 |

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use tablebook_core::{parse_booking_date, parse_time_of_day, BookingDraft, BookingKey, Outcome};
use tablebook_sdk::config::{parse_timeout_secs, BASE_URL_VAR, DEFAULT_BASE_URL, TIMEOUT_VAR};
use tablebook_sdk::{BookingOrchestrator, ClientConfig, HttpAuthority};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Parser)]
#[command(name = "tablebook")]
#[command(about = "Book restaurant tables against a Tablebook service", version)]
struct Cli {
    /// Booking service base URL
    #[arg(long, env = BASE_URL_VAR, default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = TIMEOUT_VAR, value_parser = parse_timeout_secs, global = true)]
    timeout_secs: Option<Duration>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the table roster
    Tables,
    /// Book a table
    Book {
        #[command(flatten)]
        slot: Slot,
        /// Party size
        #[arg(long)]
        guests: u32,
    },
    /// List bookings on a date
    ByDate {
        /// Date as YYYY-MM-DD
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
    },
    /// List a user's bookings
    ByUser {
        /// User identifier
        user: String,
    },
    /// Cancel a booking
    Cancel {
        #[command(flatten)]
        slot: Slot,
    },
    /// Show every booking as calendar events
    Calendar,
}

/// The identifying fields of a booking.
#[derive(Args)]
struct Slot {
    /// Table identifier
    #[arg(long)]
    table: String,
    /// Date as YYYY-MM-DD
    #[arg(long, value_parser = date_arg)]
    date: NaiveDate,
    /// User identifier
    #[arg(long)]
    user: String,
    /// Start time as HH:MM
    #[arg(long, value_parser = time_arg)]
    start: NaiveTime,
    /// End time as HH:MM
    #[arg(long, value_parser = time_arg)]
    end: NaiveTime,
}

impl Slot {
    fn key(&self) -> BookingKey {
        BookingKey {
            user_id: self.user.clone(),
            table_id: self.table.clone(),
            date: self.date,
            start_time: self.start,
            end_time: self.end,
        }
    }
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_booking_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw:?}"))
}

fn time_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(raw).ok_or_else(|| format!("expected HH:MM, got {raw:?}"))
}

/// Fail the process with the outcome's message unless it succeeded.
fn require<T>(outcome: Outcome<T>) -> Result<T> {
    let message = outcome.message();
    match outcome.into_value() {
        Some(value) => Ok(value),
        None => bail!(message),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::new(cli.base_url);
    if let Some(timeout) = cli.timeout_secs {
        config = config.with_timeout(timeout);
    }
    let orchestrator: BookingOrchestrator<HttpAuthority> =
        BookingOrchestrator::connect(&config).context("invalid client configuration")?;
    tracing::debug!(base_url = %orchestrator.authority().base_url(), "client ready");

    let out = render::Printer::new(cli.json);
    match cli.command {
        Commands::Tables => {
            let tables = require(orchestrator.load_tables().await)?;
            out.tables(&tables)?;
        }
        Commands::Book { slot, guests } => {
            require(orchestrator.load_tables().await)?;
            let draft = BookingDraft::new()
                .table(slot.table)
                .date(slot.date)
                .user(slot.user)
                .window(slot.start, slot.end)
                .guests(guests);
            let outcome = orchestrator.submit_booking(&draft).await;
            let message = outcome.message();
            let booking = require(outcome)?;
            out.confirmation(&message, Some(&booking))?;
        }
        Commands::ByDate { date } => {
            let bookings = require(orchestrator.query_by_date(date).await)?;
            out.bookings(&bookings)?;
        }
        Commands::ByUser { user } => {
            let bookings = require(orchestrator.query_by_user(&user).await)?;
            out.bookings(&bookings)?;
        }
        Commands::Cancel { slot } => {
            let key = slot.key();
            let bookings = require(orchestrator.query_by_user(&key.user_id).await)?;
            let Some(booking) = bookings.into_iter().find(|b| b.matches(&key)) else {
                bail!(
                    "No booking for table {} on {} {}-{}",
                    key.table_id,
                    key.date,
                    key.start_time.format("%H:%M"),
                    key.end_time.format("%H:%M")
                );
            };

            let outcome = orchestrator.cancel_booking(&booking).await;
            let message = outcome.message();
            require(outcome)?;
            out.confirmation(&message, None)?;
            out.bookings(&orchestrator.cache().bookings_by_user().await)?;
        }
        Commands::Calendar => {
            let events = require(orchestrator.load_calendar().await)?;
            out.calendar(&events)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablebook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Cli::parse()).await
}
