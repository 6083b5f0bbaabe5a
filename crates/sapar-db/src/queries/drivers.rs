//! Driver registry query functions.

use rusqlite::Connection;

use sapar_types::driver::{Driver, DriverTotals};
use sapar_types::DriverId;

use crate::{DbError, Result};

/// Register a driver, or refresh the display name of a known one.
///
/// Rating statistics are never touched. Called only after a won claim, so
/// losing claimants never get a registry row.
pub fn upsert(conn: &Connection, driver_id: DriverId, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO drivers (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        rusqlite::params![driver_id, name],
    )?;
    Ok(())
}

/// Get a driver by id.
pub fn get(conn: &Connection, driver_id: DriverId) -> Result<Driver> {
    conn.query_row(
        "SELECT id, name, rating, rating_count FROM drivers WHERE id = ?1",
        [driver_id],
        |row| {
            Ok(Driver {
                id: row.get(0)?,
                name: row.get(1)?,
                rating: row.get(2)?,
                rating_count: row.get(3)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("driver #{driver_id}")),
        other => DbError::Sqlite(other),
    })
}

/// Fold a trip score into a driver's running average.
///
/// One atomic upsert: the average and count move together, so concurrent
/// folds for the same driver serialize on the row and none is lost. A
/// missing driver row (possible only if registration was skipped) starts
/// at `(score, 1)`.
pub fn fold_rating(conn: &Connection, driver_id: DriverId, score: u8) -> Result<()> {
    conn.execute(
        "INSERT INTO drivers (id, name, rating, rating_count) VALUES (?1, '', ?2, 1)
         ON CONFLICT(id) DO UPDATE SET
             rating = (drivers.rating * drivers.rating_count + excluded.rating)
                      / (drivers.rating_count + 1),
             rating_count = drivers.rating_count + 1",
        rusqlite::params![driver_id, f64::from(score)],
    )?;
    Ok(())
}

/// Per-driver accepted-order counts and revenue, highest revenue first.
///
/// Read-only aggregate for the external dashboard.
pub fn totals(conn: &Connection) -> Result<Vec<DriverTotals>> {
    let mut stmt = conn.prepare(
        "SELECT o.driver_id,
                COALESCE(d.name, CAST(o.driver_id AS TEXT)),
                COUNT(*),
                COALESCE(SUM(o.price), 0)
         FROM orders o
         LEFT JOIN drivers d ON d.id = o.driver_id
         WHERE o.driver_id IS NOT NULL
         GROUP BY o.driver_id
         ORDER BY SUM(o.price) DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(DriverTotals {
                driver_id: row.get(0)?,
                name: row.get(1)?,
                orders: row.get(2)?,
                revenue: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::orders;
    use sapar_types::order::TripCategory;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = test_db();
        upsert(&conn, 10, "Arman").expect("upsert");

        let driver = get(&conn, 10).expect("get");
        assert_eq!(driver.name, "Arman");
        assert_eq!(driver.rating, 0.0);
        assert_eq!(driver.rating_count, 0);
    }

    #[test]
    fn test_upsert_refreshes_name_only() {
        let conn = test_db();
        upsert(&conn, 10, "Arman").expect("upsert");
        fold_rating(&conn, 10, 4).expect("fold");

        upsert(&conn, 10, "Arman B.").expect("re-upsert");

        let driver = get(&conn, 10).expect("get");
        assert_eq!(driver.name, "Arman B.");
        // Statistics survive re-registration.
        assert_eq!(driver.rating, 4.0);
        assert_eq!(driver.rating_count, 1);
    }

    #[test]
    fn test_get_missing_driver() {
        let conn = test_db();
        assert!(matches!(get(&conn, 404), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_fold_rating_math() {
        let conn = test_db();
        upsert(&conn, 10, "Arman").expect("upsert");

        fold_rating(&conn, 10, 4).expect("fold 4");
        fold_rating(&conn, 10, 2).expect("fold 2");

        let driver = get(&conn, 10).expect("get");
        assert_eq!(driver.rating, 3.0);
        assert_eq!(driver.rating_count, 2);
    }

    #[test]
    fn test_fold_rating_order_independent() {
        let conn = test_db();
        upsert(&conn, 10, "A").expect("upsert");
        upsert(&conn, 20, "B").expect("upsert");

        fold_rating(&conn, 10, 4).expect("fold");
        fold_rating(&conn, 10, 2).expect("fold");
        fold_rating(&conn, 20, 2).expect("fold");
        fold_rating(&conn, 20, 4).expect("fold");

        let a = get(&conn, 10).expect("get");
        let b = get(&conn, 20).expect("get");
        assert_eq!(a.rating, b.rating);
        assert_eq!(a.rating_count, b.rating_count);
    }

    #[test]
    fn test_fold_rating_unknown_driver() {
        let conn = test_db();
        fold_rating(&conn, 99, 5).expect("fold");

        let driver = get(&conn, 99).expect("get");
        assert_eq!(driver.rating, 5.0);
        assert_eq!(driver.rating_count, 1);
    }

    #[test]
    fn test_totals() {
        let conn = test_db();
        let cheap = orders::insert(
            &conn,
            "A",
            "B",
            500,
            "+77011234567",
            1,
            TripCategory::Local,
            1000,
        )
        .expect("insert");
        let pricey = orders::insert(
            &conn,
            "C",
            "D",
            4000,
            "+77011234567",
            2,
            TripCategory::Intercity,
            1001,
        )
        .expect("insert");

        orders::try_claim(&conn, cheap, 10).expect("claim");
        orders::try_claim(&conn, pricey, 20).expect("claim");
        upsert(&conn, 10, "Arman").expect("upsert");
        upsert(&conn, 20, "Bolat").expect("upsert");

        let totals = totals(&conn).expect("totals");
        assert_eq!(totals.len(), 2);
        // Highest revenue first
        assert_eq!(totals[0].driver_id, 20);
        assert_eq!(totals[0].name, "Bolat");
        assert_eq!(totals[0].revenue, 4000);
        assert_eq!(totals[1].orders, 1);
    }
}
