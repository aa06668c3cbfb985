//! Terminal output.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tablebook_core::{Booking, CalendarEvent, Table};

/// Writes results either as aligned text or as JSON.
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn tables(&self, tables: &[Table]) -> Result<()> {
        if self.json {
            return emit_json(tables);
        }
        let mut out = io::stdout().lock();
        if tables.is_empty() {
            writeln!(out, "No tables.")?;
        }
        for table in tables {
            writeln!(out, "{:<12} seats {}", table.table_id, table.capacity)?;
        }
        Ok(())
    }

    pub fn bookings(&self, bookings: &[Booking]) -> Result<()> {
        if self.json {
            return emit_json(bookings);
        }
        let mut out = io::stdout().lock();
        if bookings.is_empty() {
            writeln!(out, "No bookings.")?;
        }
        for line in bookings.iter().map(booking_line) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    pub fn calendar(&self, events: &[CalendarEvent]) -> Result<()> {
        if self.json {
            return emit_json(events);
        }
        let mut out = io::stdout().lock();
        for event in events {
            writeln!(
                out,
                "{}  {}-{}  {}",
                event.start.format("%Y-%m-%d"),
                event.start.format("%H:%M"),
                event.end.format("%H:%M"),
                event.title
            )?;
        }
        Ok(())
    }

    pub fn confirmation(&self, message: &str, booking: Option<&Booking>) -> Result<()> {
        if self.json {
            return emit_json(&serde_json::json!({ "message": message, "booking": booking }));
        }
        let mut out = io::stdout().lock();
        writeln!(out, "{message}")?;
        if let Some(booking) = booking {
            writeln!(out, "{}", booking_line(booking))?;
        }
        Ok(())
    }
}

fn booking_line(booking: &Booking) -> String {
    format!(
        "{}  {}-{}  table {:<8} {:<16} guests {}",
        booking.date.format("%Y-%m-%d"),
        booking.start_time.format("%H:%M"),
        booking.end_time.format("%H:%M"),
        booking.table_id,
        booking.user_id,
        booking.guests
    )
}

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
