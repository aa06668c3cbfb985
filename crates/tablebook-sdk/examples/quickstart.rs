//! Quick Start Example
//!
//! Loads the roster, books a table and watches the cache update.
//! Point `TABLEBOOK_BASE_URL` at a running booking service first.

use chrono::{Local, NaiveTime};
use tablebook_sdk::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let orchestrator = BookingOrchestrator::connect(&ClientConfig::from_env()?)?;

    // Print every cache change as it lands
    let mut subscription = orchestrator.cache().subscribe(SliceFilter::all()).await;
    let watcher = tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            println!("📊 {:?} {:?}: {} rows", event.slice, event.change, event.len);
        }
    });

    // 1. Load the roster
    let tables = orchestrator.load_tables().await;
    println!("🍽️  {}", tables.message());
    let Some(table) = tables.value().and_then(|t| t.first()).cloned() else {
        println!("❌ No tables available");
        return Ok(());
    };

    // 2. Show what is already booked today
    let today = Local::now().date_naive();
    let booked = orchestrator.query_by_date(today).await;
    println!("📅 {} ({} today)", booked.message(), booked.value().map_or(0, Vec::len));

    // 3. Book the first table for two
    let draft = BookingDraft::new()
        .table(&table.table_id)
        .date(today)
        .user("quickstart")
        .window(
            NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
        )
        .guests(table.capacity.min(2));

    let outcome = orchestrator.submit_booking(&draft).await;
    match outcome.value() {
        Some(booking) => println!("✅ {} Table {}", outcome.message(), booking.table_id),
        None => println!("❌ {}", outcome.message()),
    }

    // 4. Everything on the calendar
    let calendar = orchestrator.load_calendar().await;
    for event in calendar.value().into_iter().flatten() {
        println!("   {} {} -> {}", event.title, event.start, event.end);
    }

    watcher.abort();
    Ok(())
}
