use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::booking::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use crate::models::{Account, Booking, BookingStatus, ServiceType};

const BOOKING_COLUMNS: &str = "id, email, name, phone, address, vehicle_number, service_type, \
     date, time, status, kilometers, amount, delivery_date, created_at, updated_at";

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, email, name, phone, address, vehicle_number, service_type,
                               date, time, status, kilometers, amount, delivery_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            booking.id,
            booking.email,
            booking.name,
            booking.phone,
            booking.address,
            booking.vehicle_number,
            booking.service_type.as_str(),
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format(TIME_FORMAT).to_string(),
            booking.status.as_str(),
            booking.kilometers,
            booking.amount,
            booking
                .delivery_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .context("failed to insert booking")?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;

    result.transpose()
}

/// Every booking, earliest requested slot first. Bookings for the same slot
/// keep their submission order.
pub fn list_bookings_by_schedule(conn: &Connection) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY date ASC, time ASC, rowid ASC");
    collect_bookings(conn, &sql, params![])
}

/// Bookings owned by `email` (exact match), in submission order.
pub fn list_bookings_for_owner(conn: &Connection, email: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE email = ?1 ORDER BY rowid ASC");
    collect_bookings(conn, &sql, params![email])
}

/// Writes the admin-editable columns back in one statement. Returns false when
/// the row no longer exists.
pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn
        .execute(
            "UPDATE bookings
             SET kilometers = ?1, amount = ?2, status = ?3, delivery_date = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                booking.kilometers,
                booking.amount,
                booking.status.as_str(),
                booking
                    .delivery_date
                    .map(|d| d.format(DATE_FORMAT).to_string()),
                booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
                booking.id,
            ],
        )
        .context("failed to update booking")?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn
        .execute("DELETE FROM bookings WHERE id = ?1", params![id])
        .context("failed to delete booking")?;
    Ok(count > 0)
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let service_type: String = row.get(6)?;
    let date: String = row.get(7)?;
    let time: String = row.get(8)?;
    let status: String = row.get(9)?;
    let delivery_date: Option<String> = row.get(12)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(Booking {
        email: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        vehicle_number: row.get(5)?,
        service_type: ServiceType::parse(&service_type)?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .with_context(|| format!("booking {id} has malformed date '{date}'"))?,
        time: NaiveTime::parse_from_str(&time, TIME_FORMAT)
            .with_context(|| format!("booking {id} has malformed time '{time}'"))?,
        status: BookingStatus::parse(&status)?,
        kilometers: measure_from_sql(row.get(10)?),
        amount: measure_from_sql(row.get(11)?),
        delivery_date: delivery_date
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
            .with_context(|| format!("booking {id} has malformed created_at"))?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at, TIMESTAMP_FORMAT)
            .with_context(|| format!("booking {id} has malformed updated_at"))?,
        id,
    })
}

/// Stored measures may be numbers or numeric text; anything else reads as unset.
fn measure_from_sql(value: SqlValue) -> Option<f64> {
    let number = match value {
        SqlValue::Integer(i) => i as f64,
        SqlValue::Real(r) => r,
        SqlValue::Text(t) => t.trim().parse().ok()?,
        SqlValue::Null | SqlValue::Blob(_) => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}

// ── Accounts ──

pub fn insert_account(conn: &Connection, account: &Account) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, name, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.id,
            account.name,
            account.email,
            account.password_hash,
            account.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .context("failed to insert account")?;
    Ok(())
}

/// True when `err` came from a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

pub fn get_account_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, name, email, password_hash, created_at FROM accounts WHERE email = ?1",
            params![email],
            |row| {
                let created_at: String = row.get(4)?;
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                        .unwrap_or_default(),
                })
            },
        )
        .optional()?;
    Ok(account)
}
