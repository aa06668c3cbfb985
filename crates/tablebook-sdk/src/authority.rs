//! The contract of the remote booking authority.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tablebook_core::{Booking, Result, Table};

/// The remote service that stores bookings and decides conflicts.
///
/// Implementations report a declined request as
/// [`tablebook_core::BookingError::Rejected`] and network or decoding
/// failures as `Transport` / `InvalidResponse`.
#[async_trait]
pub trait BookingAuthority: Send + Sync {
    /// `GET /tables`
    async fn tables(&self) -> Result<Vec<Table>>;

    /// `GET /bookings/{date}`. An empty result is not an error.
    async fn bookings_by_date(&self, date: NaiveDate) -> Result<Vec<Booking>>;

    /// `GET /bookings/user/{userId}`
    async fn bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>>;

    /// `GET /bookings`
    async fn all_bookings(&self) -> Result<Vec<Booking>>;

    /// `POST /bookings`
    async fn create_booking(&self, booking: &Booking) -> Result<()>;

    /// `POST /bookings/deletebooking`
    async fn delete_booking(&self, booking: &Booking) -> Result<()>;
}

#[async_trait]
impl<T: BookingAuthority + ?Sized> BookingAuthority for Arc<T> {
    async fn tables(&self) -> Result<Vec<Table>> {
        (**self).tables().await
    }

    async fn bookings_by_date(&self, date: NaiveDate) -> Result<Vec<Booking>> {
        (**self).bookings_by_date(date).await
    }

    async fn bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        (**self).bookings_by_user(user_id).await
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        (**self).all_bookings().await
    }

    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        (**self).create_booking(booking).await
    }

    async fn delete_booking(&self, booking: &Booking) -> Result<()> {
        (**self).delete_booking(booking).await
    }
}
