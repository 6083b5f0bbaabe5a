//! Order query functions, including the atomic claim.

use rusqlite::Connection;

use sapar_types::order::{ClaimOutcome, Order, OrderStatus, RatingOutcome, TripCategory};
use sapar_types::{BroadcastHandle, DriverId, OrderId, PassengerId};

use crate::{DbError, Result};

const ORDER_COLUMNS: &str = "id, origin, destination, price, phone, passenger_id, \
     category, status, driver_id, broadcast_handle, rating, created_at";

/// Insert a new order. Append-only; input is validated by the caller.
pub fn insert(
    conn: &Connection,
    origin: &str,
    destination: &str,
    price: u32,
    phone: &str,
    passenger_id: PassengerId,
    category: TripCategory,
    created_at: u64,
) -> Result<OrderId> {
    conn.execute(
        "INSERT INTO orders (origin, destination, price, phone, passenger_id, category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            origin,
            destination,
            price,
            phone,
            passenger_id,
            category.as_str(),
            created_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record where the pool broadcast for this order lives. Idempotent.
pub fn attach_broadcast_handle(
    conn: &Connection,
    order_id: OrderId,
    handle: BroadcastHandle,
) -> Result<()> {
    conn.execute(
        "UPDATE orders SET broadcast_handle = ?1 WHERE id = ?2",
        rusqlite::params![handle, order_id],
    )?;
    Ok(())
}

/// Get an order by id.
pub fn get(conn: &Connection, order_id: OrderId) -> Result<Order> {
    conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
        [order_id],
        row_to_order,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("order #{order_id}")),
        other => DbError::Sqlite(other),
    })
}

/// Attempt to claim an order for a driver.
///
/// The transition is one conditional UPDATE guarded on `status = 'new'`,
/// then a re-read of the stored driver identity. Any number of concurrent
/// attempts yields exactly one [`ClaimOutcome::Won`]; the statement is the
/// only coordination primitive, so the guarantee holds across processes.
pub fn try_claim(conn: &Connection, order_id: OrderId, driver_id: DriverId) -> Result<ClaimOutcome> {
    let changed = conn.execute(
        "UPDATE orders SET status = 'accepted', driver_id = ?1
         WHERE id = ?2 AND status = 'new'",
        rusqlite::params![driver_id, order_id],
    )?;

    let holder: Option<DriverId> = conn
        .query_row(
            "SELECT driver_id FROM orders WHERE id = ?1",
            [order_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("order #{order_id}"))
            }
            other => DbError::Sqlite(other),
        })?;

    if changed == 1 {
        Ok(ClaimOutcome::Won)
    } else if holder == Some(driver_id) {
        Ok(ClaimOutcome::AlreadyMine)
    } else {
        Ok(ClaimOutcome::Taken)
    }
}

/// Transition an order `accepted -> completed`.
///
/// Returns false when no row transitioned (unknown id, still new, or
/// already completed), making concurrent completions safe.
pub fn mark_completed(conn: &Connection, order_id: OrderId) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE orders SET status = 'completed' WHERE id = ?1 AND status = 'accepted'",
        [order_id],
    )?;
    Ok(changed == 1)
}

/// Attach a passenger rating to a completed order. First rating wins.
///
/// The caller validates the 1..=5 range.
pub fn set_rating(conn: &Connection, order_id: OrderId, rating: u8) -> Result<RatingOutcome> {
    let changed = conn.execute(
        "UPDATE orders SET rating = ?1
         WHERE id = ?2 AND status = 'completed' AND rating = 0",
        rusqlite::params![rating, order_id],
    )?;

    let (status, driver_id): (String, Option<DriverId>) = conn
        .query_row(
            "SELECT status, driver_id FROM orders WHERE id = ?1",
            [order_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("order #{order_id}"))
            }
            other => DbError::Sqlite(other),
        })?;

    if changed == 1 {
        Ok(RatingOutcome::Applied { driver_id })
    } else if status != "completed" {
        Ok(RatingOutcome::NotCompleted)
    } else {
        Ok(RatingOutcome::AlreadyRated { driver_id })
    }
}

/// List open orders, oldest first.
pub fn open_orders(conn: &Connection) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = 'new' ORDER BY id"
    ))?;

    let rows = stmt
        .query_map([], row_to_order)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// List a driver's orders, newest first.
pub fn orders_for_driver(conn: &Connection, driver_id: DriverId) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE driver_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt
        .query_map([driver_id], row_to_order)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Map a full order row.
fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let category: String = row.get(6)?;
    let status: String = row.get(7)?;
    Ok(Order {
        id: row.get(0)?,
        origin: row.get(1)?,
        destination: row.get(2)?,
        price: row.get(3)?,
        phone: row.get(4)?,
        passenger_id: row.get(5)?,
        category: TripCategory::parse(&category).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown trip category '{category}'").into(),
            )
        })?,
        status: OrderStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                format!("unknown order status '{status}'").into(),
            )
        })?,
        driver_id: row.get(8)?,
        broadcast_handle: row.get(9)?,
        rating: row.get(10)?,
        created_at: row.get::<_, i64>(11)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn new_order(conn: &Connection) -> OrderId {
        insert(
            conn,
            "Abay 10",
            "Airport",
            500,
            "+77011234567",
            9001,
            TripCategory::Local,
            1_700_000_000,
        )
        .expect("insert order")
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let id = new_order(&conn);

        let order = get(&conn, id).expect("get");
        assert_eq!(order.origin, "Abay 10");
        assert_eq!(order.destination, "Airport");
        assert_eq!(order.price, 500);
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.driver_id, None);
        assert_eq!(order.rating, 0);
        assert_eq!(order.broadcast_handle, None);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let conn = test_db();
        let first = new_order(&conn);
        let second = new_order(&conn);
        assert!(second > first);
    }

    #[test]
    fn test_get_missing_order() {
        let conn = test_db();
        let result = get(&conn, 404);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_attach_broadcast_handle() {
        let conn = test_db();
        let id = new_order(&conn);

        attach_broadcast_handle(&conn, id, 555).expect("attach");
        // Idempotent re-attach
        attach_broadcast_handle(&conn, id, 555).expect("re-attach");

        let order = get(&conn, id).expect("get");
        assert_eq!(order.broadcast_handle, Some(555));
    }

    #[test]
    fn test_first_claim_wins() {
        let conn = test_db();
        let id = new_order(&conn);

        assert_eq!(try_claim(&conn, id, 1).expect("claim"), ClaimOutcome::Won);
        assert_eq!(try_claim(&conn, id, 2).expect("claim"), ClaimOutcome::Taken);

        let order = get(&conn, id).expect("get");
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.driver_id, Some(1));
    }

    #[test]
    fn test_winner_retry_is_already_mine() {
        let conn = test_db();
        let id = new_order(&conn);

        assert_eq!(try_claim(&conn, id, 1).expect("claim"), ClaimOutcome::Won);
        // A retried claim must not report a second win.
        assert_eq!(
            try_claim(&conn, id, 1).expect("retry"),
            ClaimOutcome::AlreadyMine
        );
    }

    #[test]
    fn test_claim_missing_order() {
        let conn = test_db();
        let result = try_claim(&conn, 404, 1);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_claim_completed_order() {
        let conn = test_db();
        let id = new_order(&conn);
        try_claim(&conn, id, 1).expect("claim");
        mark_completed(&conn, id).expect("complete");

        assert_eq!(try_claim(&conn, id, 2).expect("claim"), ClaimOutcome::Taken);
    }

    #[test]
    fn test_completion_requires_accepted() {
        let conn = test_db();
        let id = new_order(&conn);

        // Still new: nothing to complete.
        assert!(!mark_completed(&conn, id).expect("complete new"));

        try_claim(&conn, id, 1).expect("claim");
        assert!(mark_completed(&conn, id).expect("complete"));
        // Second completion is a no-op.
        assert!(!mark_completed(&conn, id).expect("re-complete"));

        let order = get(&conn, id).expect("get");
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_first_rating_wins() {
        let conn = test_db();
        let id = new_order(&conn);
        try_claim(&conn, id, 7).expect("claim");
        mark_completed(&conn, id).expect("complete");

        assert_eq!(
            set_rating(&conn, id, 5).expect("rate"),
            RatingOutcome::Applied { driver_id: Some(7) }
        );
        assert_eq!(
            set_rating(&conn, id, 1).expect("re-rate"),
            RatingOutcome::AlreadyRated { driver_id: Some(7) }
        );

        let order = get(&conn, id).expect("get");
        assert_eq!(order.rating, 5);
    }

    #[test]
    fn test_rating_requires_completion() {
        let conn = test_db();
        let id = new_order(&conn);

        assert_eq!(
            set_rating(&conn, id, 5).expect("rate new"),
            RatingOutcome::NotCompleted
        );

        try_claim(&conn, id, 7).expect("claim");
        assert_eq!(
            set_rating(&conn, id, 5).expect("rate accepted"),
            RatingOutcome::NotCompleted
        );

        let order = get(&conn, id).expect("get");
        assert_eq!(order.rating, 0);
    }

    #[test]
    fn test_open_orders_listing() {
        let conn = test_db();
        let first = new_order(&conn);
        let second = new_order(&conn);
        try_claim(&conn, first, 1).expect("claim");

        let open = open_orders(&conn).expect("list");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second);
    }

    #[test]
    fn test_orders_for_driver() {
        let conn = test_db();
        let first = new_order(&conn);
        let second = new_order(&conn);
        let third = new_order(&conn);
        try_claim(&conn, first, 1).expect("claim");
        try_claim(&conn, third, 1).expect("claim");
        try_claim(&conn, second, 2).expect("claim");

        let mine = orders_for_driver(&conn, 1).expect("list");
        assert_eq!(mine.len(), 2);
        // Newest first
        assert_eq!(mine[0].id, third);
        assert_eq!(mine[1].id, first);
    }
}
