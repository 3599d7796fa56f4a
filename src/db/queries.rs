use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, Payment, PaymentStatus, PaymentType, Service};

const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(DATE_FMT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATE_FMT)
        .map_err(|e| anyhow::anyhow!("bad timestamp {s:?}: {e}"))
}

fn now_str() -> String {
    Utc::now().naive_utc().format(DATE_FMT).to_string()
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, duration_minutes, price_cents, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            service.id,
            service.name,
            service.description,
            service.duration_minutes,
            service.price_cents,
            service.active,
            fmt_ts(&service.created_at),
        ],
    )?;
    Ok(())
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let created_at_str: String = row.get(6)?;
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price_cents: row.get(4)?,
        active: row.get(5)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

const SERVICE_COLS: &str = "id, name, description, duration_minutes, price_cents, active, created_at";

pub fn get_service_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        &format!("SELECT {SERVICE_COLS} FROM services WHERE id = ?1"),
        params![id],
        |row| Ok(parse_service_row(row)),
    );

    match result {
        Ok(service) => Ok(Some(service?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_service_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        &format!("SELECT {SERVICE_COLS} FROM services WHERE name = ?1 COLLATE NOCASE"),
        params![name],
        |row| Ok(parse_service_row(row)),
    );

    match result {
        Ok(service) => Ok(Some(service?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_active_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLS} FROM services WHERE active = 1 ORDER BY name ASC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn set_service_active(conn: &Connection, id: &str, active: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLS: &str = "id, service_id, customer_name, customer_email, customer_phone, address, \
     scheduled_date, status, notes, budget, total_amount_cents, deposit_amount_cents, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, service_id, customer_name, customer_email, customer_phone, address,
            scheduled_date, status, notes, budget, total_amount_cents, deposit_amount_cents, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.service_id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.address,
            fmt_ts(&booking.scheduled_date),
            booking.status.as_str(),
            booking.notes,
            booking.budget,
            booking.total_amount_cents,
            booking.deposit_amount_cents,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let scheduled_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        address: row.get(5)?,
        scheduled_date: parse_ts(&scheduled_str)?,
        status: BookingStatus::from_str(&status_str),
        notes: row.get(8)?,
        budget: row.get(9)?,
        total_amount_cents: row.get(10)?,
        deposit_amount_cents: row.get(11)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE status = ?1 ORDER BY scheduled_date DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {BOOKING_COLS} FROM bookings ORDER BY scheduled_date DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Allow-listed booking fields updatable over PATCH. Anything else a client
/// sends is discarded before it reaches this struct.
#[derive(Debug, Default)]
pub struct BookingUpdate {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub budget: Option<String>,
}

pub fn update_booking(conn: &Connection, id: &str, update: &BookingUpdate) -> anyhow::Result<bool> {
    let mut sets: Vec<String> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    let mut push = |column: &str, value: Box<dyn rusqlite::types::ToSql>| {
        values.push(value);
        sets.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(v) = &update.customer_name {
        push("customer_name", Box::new(v.clone()));
    }
    if let Some(v) = &update.customer_email {
        push("customer_email", Box::new(v.clone()));
    }
    if let Some(v) = &update.customer_phone {
        push("customer_phone", Box::new(v.clone()));
    }
    if let Some(v) = &update.address {
        push("address", Box::new(v.clone()));
    }
    if let Some(v) = &update.scheduled_date {
        push("scheduled_date", Box::new(fmt_ts(v)));
    }
    if let Some(v) = &update.status {
        push("status", Box::new(v.as_str().to_string()));
    }
    if let Some(v) = &update.notes {
        push("notes", Box::new(v.clone()));
    }
    if let Some(v) = &update.budget {
        push("budget", Box::new(v.clone()));
    }

    if sets.is_empty() {
        return Ok(get_booking_by_id(conn, id)?.is_some());
    }

    values.push(Box::new(now_str()));
    sets.push(format!("updated_at = ?{}", values.len()));
    values.push(Box::new(id.to_string()));

    let sql = format!(
        "UPDATE bookings SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|p| p.as_ref()).collect();
    let count = conn.execute(&sql, params_refs.as_slice())?;
    Ok(count > 0)
}

/// Transition a booking pending → confirmed. Conditional so two racing
/// payment notifications cannot both observe the transition.
pub fn confirm_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'confirmed', updated_at = ?1 WHERE id = ?2 AND status = 'pending'",
        params![now_str(), id],
    )?;
    Ok(count > 0)
}

// ── Payments ──

const PAYMENT_COLS: &str = "id, booking_id, amount_cents, currency, status, payment_type, \
     intent_id, charge_id, paid_at, created_at, updated_at";

pub fn create_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, amount_cents, currency, status, payment_type,
            intent_id, charge_id, paid_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            payment.id,
            payment.booking_id,
            payment.amount_cents,
            payment.currency,
            payment.status.as_str(),
            payment.payment_type.as_str(),
            payment.intent_id,
            payment.charge_id,
            payment.paid_at.as_ref().map(fmt_ts),
            fmt_ts(&payment.created_at),
            fmt_ts(&payment.updated_at),
        ],
    )?;
    Ok(())
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let status_str: String = row.get(4)?;
    let type_str: String = row.get(5)?;
    let paid_at_str: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount_cents: row.get(2)?,
        currency: row.get(3)?,
        status: PaymentStatus::from_str(&status_str),
        payment_type: PaymentType::from_str(&type_str),
        intent_id: row.get(6)?,
        charge_id: row.get(7)?,
        paid_at: paid_at_str.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

fn get_payment_where(
    conn: &Connection,
    clause: &str,
    value: &str,
) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        &format!("SELECT {PAYMENT_COLS} FROM payments WHERE {clause} = ?1"),
        params![value],
        |row| Ok(parse_payment_row(row)),
    );

    match result {
        Ok(payment) => Ok(Some(payment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_payment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Payment>> {
    get_payment_where(conn, "id", id)
}

pub fn get_payment_by_intent(conn: &Connection, intent_id: &str) -> anyhow::Result<Option<Payment>> {
    get_payment_where(conn, "intent_id", intent_id)
}

pub fn get_payment_by_charge(conn: &Connection, charge_id: &str) -> anyhow::Result<Option<Payment>> {
    get_payment_where(conn, "charge_id", charge_id)
}

pub fn get_payments_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLS} FROM payments WHERE booking_id = ?1 ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_payment_row(row)))?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row??);
    }
    Ok(payments)
}

// Payment state transitions. Each one is a conditional update guarded on the
// current status, so an already-applied transition is a no-op (`false`) and
// terminal states never regress. Returns whether this call changed the row.

pub fn mark_payment_succeeded(
    conn: &Connection,
    intent_id: &str,
    charge_id: Option<&str>,
) -> anyhow::Result<bool> {
    let now = now_str();
    let count = conn.execute(
        "UPDATE payments SET status = 'succeeded', charge_id = COALESCE(?1, charge_id),
            paid_at = ?2, updated_at = ?2
         WHERE intent_id = ?3 AND status = 'pending'",
        params![charge_id, now, intent_id],
    )?;
    Ok(count > 0)
}

pub fn mark_payment_failed(conn: &Connection, intent_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'failed', updated_at = ?1
         WHERE intent_id = ?2 AND status = 'pending'",
        params![now_str(), intent_id],
    )?;
    Ok(count > 0)
}

pub fn mark_payment_refunded(conn: &Connection, charge_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'refunded', updated_at = ?1
         WHERE charge_id = ?2 AND status = 'succeeded'",
        params![now_str(), charge_id],
    )?;
    Ok(count > 0)
}
