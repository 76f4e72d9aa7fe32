//! Role-gated booking lifecycle operations.
//!
//! Every function takes the caller's [`Session`] and performs one unit of work
//! against the store. Handlers hold the connection lock only for the duration
//! of a single call.

use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, NewBooking, Session};

pub fn create_booking(
    conn: &Connection,
    requester: &Session,
    mut input: NewBooking,
) -> Result<Booking, AppError> {
    if input.email.trim().is_empty() {
        input.email = requester.email.clone();
    } else if !requester.is_admin() && !requester.owns(input.email.trim()) {
        return Err(AppError::Forbidden(
            "the booking email does not match the logged-in user".to_string(),
        ));
    }

    let booking = Booking::create(input, Utc::now().naive_utc())?;
    queries::insert_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        owner = %booking.email,
        service = booking.service_type.as_str(),
        "booking created"
    );
    Ok(booking)
}

/// Admin-only partial update over {kilometers, amount, status, deliveryDate}.
pub fn update_fields(
    conn: &Connection,
    requester: &Session,
    id: &str,
    body: &Value,
) -> Result<Booking, AppError> {
    if !requester.is_admin() {
        return Err(AppError::Forbidden("only staff may update bookings".to_string()));
    }

    let patch = BookingPatch::from_json(body)?;

    let mut booking = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if let Some(next) = patch.status {
        booking.status.check_transition(next)?;
    }

    let previous_status = booking.status;
    booking.apply(&patch, Utc::now().naive_utc());

    if !queries::update_booking(conn, &booking)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }

    tracing::info!(
        booking_id = id,
        from = previous_status.as_str(),
        to = booking.status.as_str(),
        "booking updated"
    );
    Ok(booking)
}

/// Admins may delete anything. Owners may cancel their own booking while it is
/// still Pending.
pub fn delete_booking(conn: &Connection, requester: &Session, id: &str) -> Result<(), AppError> {
    let booking = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if !requester.is_admin() {
        if !requester.owns(&booking.email) {
            return Err(AppError::Forbidden("booking belongs to another customer".to_string()));
        }
        if !booking.status.is_cancellable() {
            return Err(AppError::Forbidden(format!(
                "booking is {} and can no longer be cancelled",
                booking.status
            )));
        }
    }

    if !queries::delete_booking(conn, id)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }

    tracing::info!(booking_id = id, by = %requester.email, admin = requester.is_admin(), "booking deleted");
    Ok(())
}

/// Admin triage queue, ordered by requested date and time.
pub fn list_all(conn: &Connection, requester: &Session) -> Result<Vec<Booking>, AppError> {
    if !requester.is_admin() {
        return Err(AppError::Forbidden("only staff may list all bookings".to_string()));
    }
    Ok(queries::list_bookings_by_schedule(conn)?)
}

pub fn list_for_owner(
    conn: &Connection,
    requester: &Session,
    email: &str,
) -> Result<Vec<Booking>, AppError> {
    if !requester.is_admin() && !requester.owns(email) {
        return Err(AppError::Forbidden("cannot list another customer's bookings".to_string()));
    }
    Ok(queries::list_bookings_for_owner(conn, email)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::BookingStatus;
    use serde_json::json;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn admin() -> Session {
        Session::admin("admin@bikes.test")
    }

    fn submit(conn: &Connection, owner: &str, date: &str, time: &str) -> Booking {
        let input = NewBooking {
            name: "Priya".to_string(),
            email: owner.to_string(),
            phone: "9000000000".to_string(),
            address: "4 Temple St".to_string(),
            vehicle_number: "KA 01 X 9".to_string(),
            service_type: "Brake Service".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            status: None,
        };
        create_booking(conn, &Session::customer(owner), input).unwrap()
    }

    #[test]
    fn test_created_bookings_are_pending_and_stable() {
        let conn = setup_db();
        let a = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, BookingStatus::Pending);

        let listed = list_for_owner(&conn, &Session::customer("u@x.com"), "u@x.com").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }

    #[test]
    fn test_create_defaults_email_to_session() {
        let conn = setup_db();
        let input = NewBooking {
            name: "Priya".to_string(),
            service_type: "Water Wash".to_string(),
            date: "2025-06-16".to_string(),
            time: "10:00".to_string(),
            ..Default::default()
        };
        let booking = create_booking(&conn, &Session::customer("p@x.com"), input).unwrap();
        assert_eq!(booking.email, "p@x.com");
    }

    #[test]
    fn test_create_for_someone_else_is_forbidden() {
        let conn = setup_db();
        let input = NewBooking {
            name: "Priya".to_string(),
            email: "victim@x.com".to_string(),
            service_type: "Water Wash".to_string(),
            date: "2025-06-16".to_string(),
            time: "10:00".to_string(),
            ..Default::default()
        };
        let err = create_booking(&conn, &Session::customer("p@x.com"), input.clone()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let booking = create_booking(&conn, &admin(), input).unwrap();
        assert_eq!(booking.email, "victim@x.com");
    }

    #[test]
    fn test_list_all_is_schedule_ordered() {
        let conn = setup_db();
        submit(&conn, "a@x.com", "2025-07-01", "09:00");
        submit(&conn, "b@x.com", "2025-06-30", "17:45");
        submit(&conn, "c@x.com", "2025-07-01", "08:59");
        submit(&conn, "d@x.com", "2025-06-30", "07:00");

        let listed = list_all(&conn, &admin()).unwrap();
        let keys: Vec<_> = listed.iter().map(|b| (b.date, b.time)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(listed[0].email, "d@x.com");
    }

    #[test]
    fn test_list_all_requires_admin() {
        let conn = setup_db();
        let err = list_all(&conn, &Session::customer("u@x.com")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_list_for_owner_only_own_records() {
        let conn = setup_db();
        submit(&conn, "u@x.com", "2025-06-16", "10:00");
        submit(&conn, "v@x.com", "2025-06-16", "11:00");

        let mine = list_for_owner(&conn, &Session::customer("u@x.com"), "u@x.com").unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|b| b.email == "u@x.com"));

        let err = list_for_owner(&conn, &Session::customer("u@x.com"), "v@x.com").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_update_requires_admin() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        let err = update_fields(
            &conn,
            &Session::customer("u@x.com"),
            &b.id,
            &json!({ "status": "Completed" }),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_update_rejects_unknown_and_negative_fields() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");

        let err = update_fields(&conn, &admin(), &b.id, &json!({ "email": "x@y.com" })).unwrap_err();
        assert!(matches!(err, AppError::InvalidField(_)));

        let err = update_fields(&conn, &admin(), &b.id, &json!({ "kilometers": -1 })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_fields(&conn, &admin(), &b.id, &json!({ "amount": "-20" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_update_missing_booking() {
        let conn = setup_db();
        let err = update_fields(&conn, &admin(), "nope", &json!({ "amount": 10 })).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_invalid_status_leaves_record_unchanged() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");

        let err = update_fields(
            &conn,
            &admin(),
            &b.id,
            &json!({ "status": "Shipped", "kilometers": 99 }),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(_)));

        let stored = queries::get_booking_by_id(&conn, &b.id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.kilometers, None);
    }

    #[test]
    fn test_completed_status_is_final_but_measures_editable() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        update_fields(&conn, &admin(), &b.id, &json!({ "status": "Completed" })).unwrap();

        let err =
            update_fields(&conn, &admin(), &b.id, &json!({ "status": "Accepted" })).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = update_fields(
            &conn,
            &admin(),
            &b.id,
            &json!({ "amount": 450.5, "deliveryDate": "2025-06-18" }),
        )
        .unwrap();
        assert_eq!(updated.status, BookingStatus::Completed);
        assert_eq!(updated.amount, Some(450.5));
    }

    #[test]
    fn test_admin_may_assign_status_out_of_order() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        let updated =
            update_fields(&conn, &admin(), &b.id, &json!({ "status": "On-Process" })).unwrap();
        assert_eq!(updated.status, BookingStatus::OnProcess);

        let updated =
            update_fields(&conn, &admin(), &b.id, &json!({ "status": "Pending" })).unwrap();
        assert_eq!(updated.status, BookingStatus::Pending);
    }

    #[test]
    fn test_accept_then_owner_cannot_cancel() {
        let conn = setup_db();
        let owner = Session::customer("u@x.com");
        let a = submit(&conn, "u@x.com", "2025-06-16", "10:00");

        update_fields(&conn, &admin(), &a.id, &json!({ "status": "Accepted", "kilometers": 12 }))
            .unwrap();

        let listed = list_all(&conn, &admin()).unwrap();
        let shown = listed.iter().find(|b| b.id == a.id).unwrap();
        assert_eq!(shown.status, BookingStatus::Accepted);
        assert_eq!(shown.kilometers, Some(12.0));
        assert_eq!(shown.amount, None);

        let err = delete_booking(&conn, &owner, &a.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_owner_cancels_pending_booking() {
        let conn = setup_db();
        let owner = Session::customer("u@x.com");
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");

        delete_booking(&conn, &owner, &b.id).unwrap();

        let mine = list_for_owner(&conn, &owner, "u@x.com").unwrap();
        assert!(mine.iter().all(|x| x.id != b.id));
    }

    #[test]
    fn test_owner_cancel_only_while_pending() {
        let conn = setup_db();
        let owner = Session::customer("u@x.com");
        for status in ["Accepted", "On-Process", "Completed"] {
            let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
            update_fields(&conn, &admin(), &b.id, &json!({ "status": status })).unwrap();
            let err = delete_booking(&conn, &owner, &b.id).unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)), "{status}");
        }
    }

    #[test]
    fn test_stranger_cannot_delete() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        let err = delete_booking(&conn, &Session::customer("v@x.com"), &b.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(queries::get_booking_by_id(&conn, &b.id).unwrap().is_some());
    }

    #[test]
    fn test_admin_deletes_any_status() {
        let conn = setup_db();
        let b = submit(&conn, "u@x.com", "2025-06-16", "10:00");
        update_fields(&conn, &admin(), &b.id, &json!({ "status": "Completed" })).unwrap();

        delete_booking(&conn, &admin(), &b.id).unwrap();
        let err = delete_booking(&conn, &admin(), &b.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
