//! SQLite execution of buffered deletions.
//!
//! A flush encodes the buffer as a JSON array of
//! `[osm_type, osm_id, classes]` entries, with `classes` being the kept class
//! names or `null` for a full delete, and removes the matching rows with a
//! single statement over `json_each`. Class names therefore must not contain
//! commas.

use log::info;
use rusqlite::Connection;
use thiserror::Error;

use super::DeleteBuffer;

/// Error raised when a batch of deletions cannot be executed.
#[derive(Debug, Error)]
pub enum DeleteFlushError {
    /// The deletions could not be encoded as JSON.
    #[error("failed to encode {count} deletions")]
    Encode {
        /// Number of pending deletions.
        count: usize,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The delete statement failed.
    #[error("failed to delete stale rows from {table}")]
    Execute {
        /// Target table.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

/// Quote an SQL identifier, doubling embedded quotes.
///
/// # Examples
/// ```
/// assert_eq!(gazetteer_core::quote_identifier("place"), "\"place\"");
/// assert_eq!(gazetteer_core::quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

type EncodedRequest<'a> = (&'a str, i64, Option<Vec<&'a str>>);

impl DeleteBuffer {
    /// Execute every pending deletion as one statement, then clear the buffer.
    ///
    /// `table` is the place table and `key_column` its primary key. Returns
    /// the number of rows removed. An empty buffer is a no-op. On failure the
    /// buffer is left untouched so the caller may retry.
    pub fn flush(
        &mut self,
        table: &str,
        key_column: &str,
        connection: &Connection,
    ) -> Result<usize, DeleteFlushError> {
        if self.is_empty() {
            return Ok(0);
        }

        let encoded: Vec<EncodedRequest<'_>> = self
            .requests()
            .iter()
            .map(|request| {
                let kept = request
                    .classes
                    .as_ref()
                    .map(|_| request.kept_classes().collect());
                (request.osm_type.as_str(), request.osm_id, kept)
            })
            .collect();
        let payload = serde_json::to_string(&encoded).map_err(|source| DeleteFlushError::Encode {
            count: self.len(),
            source,
        })?;

        let table_sql = quote_identifier(table);
        let key_sql = quote_identifier(key_column);
        let statement = format!(
            "DELETE FROM {table_sql} WHERE {key_sql} IN (\
                SELECT p.{key_sql} FROM json_each(?1) AS d \
                JOIN {table_sql} AS p \
                  ON p.osm_type = json_extract(d.value, '$[0]') \
                 AND p.osm_id = json_extract(d.value, '$[1]') \
                WHERE json_extract(d.value, '$[2]') IS NULL \
                   OR p.class NOT IN (\
                      SELECT k.value FROM json_each(json_extract(d.value, '$[2]')) AS k))"
        );
        let removed = connection
            .execute(&statement, [payload])
            .map_err(|source| DeleteFlushError::Execute {
                table: table.to_owned(),
                source,
            })?;

        info!(
            "flushed {} deletions from {table}, {removed} rows removed",
            self.len()
        );
        self.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OsmType;
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let connection = Connection::open_in_memory().expect("open in-memory database");
        connection
            .execute_batch(
                "CREATE TABLE place (
                    place_id INTEGER PRIMARY KEY,
                    osm_type TEXT NOT NULL,
                    osm_id INTEGER NOT NULL,
                    class TEXT NOT NULL
                );
                INSERT INTO place (osm_type, osm_id, class) VALUES
                    ('N', 1, 'amenity'),
                    ('N', 1, 'shop'),
                    ('N', 1, 'tourism'),
                    ('W', 1, 'amenity'),
                    ('N', 2, 'highway');",
            )
            .expect("seed place table");
        connection
    }

    fn remaining(connection: &Connection) -> Vec<(String, i64, String)> {
        let mut statement = connection
            .prepare("SELECT osm_type, osm_id, class FROM place ORDER BY place_id")
            .expect("prepare select");
        statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query rows")
            .collect::<Result<_, _>>()
            .expect("read rows")
    }

    fn row(osm_type: &str, osm_id: i64, class: &str) -> (String, i64, String) {
        (osm_type.to_owned(), osm_id, class.to_owned())
    }

    #[rstest]
    fn selective_delete_keeps_listed_classes(connection: Connection) {
        let mut buffer = DeleteBuffer::default();
        buffer.add(OsmType::Node, 1, "amenity,shop");

        let removed = buffer
            .flush("place", "place_id", &connection)
            .expect("flush succeeds");

        assert_eq!(removed, 1);
        assert!(!buffer.has_data());
        assert_eq!(
            remaining(&connection),
            [
                row("N", 1, "amenity"),
                row("N", 1, "shop"),
                row("W", 1, "amenity"),
                row("N", 2, "highway"),
            ]
        );
    }

    #[rstest]
    fn full_delete_removes_every_row_of_the_object(connection: Connection) {
        let mut buffer = DeleteBuffer::default();
        buffer.add_full(OsmType::Node, 1);
        buffer.add(OsmType::Node, 2, "");

        let removed = buffer
            .flush("place", "place_id", &connection)
            .expect("flush succeeds");

        assert_eq!(removed, 4);
        assert_eq!(remaining(&connection), [row("W", 1, "amenity")]);
    }

    #[rstest]
    fn flushing_an_empty_buffer_is_a_no_op(connection: Connection) {
        let mut buffer = DeleteBuffer::default();
        let removed = buffer
            .flush("missing_table", "place_id", &connection)
            .expect("empty flush never touches the database");
        assert_eq!(removed, 0);
        assert_eq!(remaining(&connection).len(), 5);
    }

    #[rstest]
    fn failed_flush_keeps_pending_deletions(connection: Connection) {
        let mut buffer = DeleteBuffer::default();
        buffer.add_full(OsmType::Node, 1);

        let err = buffer
            .flush("missing_table", "place_id", &connection)
            .expect_err("unknown table must fail");

        assert!(matches!(err, DeleteFlushError::Execute { ref table, .. } if table == "missing_table"));
        assert_eq!(buffer.len(), 1);
    }
}
