//! Row assembly in front of the [`CopyWorker`].

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::types::Value;

use super::{CopyBuffer, CopyWorker, Deleter, TargetDescr, TransportError};

/// Rows a buffer may hold before it is handed to the worker.
pub const MAX_BUFFERED_ROWS: usize = 10_000;

/// Builds rows line by line and hands finished buffers to a [`CopyWorker`].
///
/// A buffer is handed over when the target changes, when it holds more than
/// [`MAX_BUFFERED_ROWS`] rows or when its deleter is full. A deletion for an
/// object that already has rows in the current buffer hands that buffer over
/// first, so deletions never overtake rows queued before them.
pub struct CopyMgr<D: Deleter> {
    worker: CopyWorker<D>,
    current: Option<CopyBuffer<D>>,
    pending_objects: HashSet<D::Object>,
    line: Option<Vec<Value>>,
}

impl<D: Deleter> std::fmt::Debug for CopyMgr<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyMgr")
            .field("worker", &self.worker)
            .field(
                "buffered_rows",
                &self.current.as_ref().map_or(0, CopyBuffer::row_count),
            )
            .field("line_open", &self.line.is_some())
            .finish_non_exhaustive()
    }
}

impl<D: Deleter> CopyMgr<D> {
    /// Wrap a running worker.
    pub fn new(worker: CopyWorker<D>) -> Self {
        Self {
            worker,
            current: None,
            pending_objects: HashSet::new(),
            line: None,
        }
    }

    /// Start a new row for `target`.
    pub fn new_line(&mut self, target: &Arc<TargetDescr>) -> Result<(), TransportError> {
        self.switch_target(target)?;
        self.line = Some(Vec::with_capacity(target.columns().len()));
        Ok(())
    }

    /// Append the next column of the open row. Ignored when no row is open;
    /// [`CopyMgr::finish_line`] then reports the error.
    pub fn add_column(&mut self, value: impl Into<Value>) {
        if let Some(line) = self.line.as_mut() {
            line.push(value.into());
        }
    }

    /// Close the open row and queue it.
    pub fn finish_line(&mut self) -> Result<(), TransportError> {
        let line = self.line.take().ok_or(TransportError::NoOpenLine)?;
        let buffer = self.current.as_mut().ok_or(TransportError::NoOpenLine)?;
        let expected = buffer.target().columns().len();
        if line.len() != expected {
            return Err(TransportError::ColumnCount {
                table: buffer.target().name().to_owned(),
                expected,
                found: line.len(),
            });
        }
        if let Some(object) = D::row_object(&line) {
            self.pending_objects.insert(object);
        }
        buffer.push_row(line);

        let hand_over = buffer.row_count() > MAX_BUFFERED_ROWS || buffer.deleter().is_full();
        if hand_over {
            self.flush()?;
        }
        Ok(())
    }

    /// Record a deletion for `object` on `target`.
    pub fn delete_object<F>(
        &mut self,
        target: &Arc<TargetDescr>,
        object: &D::Object,
        add: F,
    ) -> Result<(), TransportError>
    where
        F: FnOnce(&mut D),
    {
        if self.pending_objects.contains(object) {
            self.flush()?;
        }
        self.switch_target(target)?;
        let full = self.current.as_mut().is_some_and(|buffer| {
            add(buffer.deleter_mut());
            buffer.deleter().is_full()
        });
        if full {
            self.flush()?;
        }
        Ok(())
    }

    /// Hand the current buffer to the worker.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.pending_objects.clear();
        match self.current.take() {
            Some(buffer) if !buffer.is_empty() => self.worker.send(buffer),
            _ => Ok(()),
        }
    }

    /// Flush, then wait until everything queued so far has landed.
    pub fn sync(&mut self) -> Result<(), TransportError> {
        self.flush()?;
        self.worker.sync()
    }

    /// Flush and stop the worker.
    pub fn finish(mut self) -> Result<(), TransportError> {
        self.flush()?;
        self.worker.finish()
    }

    fn switch_target(&mut self, target: &Arc<TargetDescr>) -> Result<(), TransportError> {
        let changed = self
            .current
            .as_ref()
            .is_some_and(|buffer| !buffer.target().same_copy_target(target));
        if changed {
            self.flush()?;
        }
        if self.current.is_none() {
            self.current = Some(CopyBuffer::new(Arc::clone(target)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rusqlite::Connection;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    /// Counts requests and reports full after [`LimitedDeleter::LIMIT`].
    #[derive(Debug, Default)]
    struct LimitedDeleter {
        pending: usize,
    }

    impl LimitedDeleter {
        const LIMIT: usize = 2;
    }

    impl Deleter for LimitedDeleter {
        type Object = i64;

        fn has_data(&self) -> bool {
            self.pending > 0
        }

        fn is_full(&self) -> bool {
            self.pending > Self::LIMIT
        }

        fn row_object(row: &[Value]) -> Option<i64> {
            match row.first() {
                Some(Value::Integer(id)) => Some(*id),
                _ => None,
            }
        }

        fn delete_rows(
            &mut self,
            _table: &str,
            _column: &str,
            _connection: &Connection,
        ) -> Result<usize, TransportError> {
            Ok(std::mem::take(&mut self.pending))
        }
    }

    struct NotesDb {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    impl NotesDb {
        fn manager(&self) -> CopyMgr<LimitedDeleter> {
            let connection = Connection::open(self.path.as_std_path()).expect("open notes db");
            connection
                .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, object INTEGER)")
                .expect("create notes table");
            CopyMgr::new(CopyWorker::spawn(connection).expect("spawn worker"))
        }

        fn count(&self) -> i64 {
            Connection::open(self.path.as_std_path())
                .expect("open reader")
                .query_row("SELECT count(*) FROM notes", [], |row| row.get(0))
                .expect("count notes")
        }
    }

    #[fixture]
    fn notes() -> NotesDb {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("notes.db")).expect("utf-8 path");
        NotesDb { _dir: dir, path }
    }

    fn target() -> Arc<TargetDescr> {
        Arc::new(TargetDescr::new("public", "notes", "id", ["object"]))
    }

    fn push_note(manager: &mut CopyMgr<LimitedDeleter>, target: &Arc<TargetDescr>, object: usize) {
        manager.new_line(target).expect("open line");
        manager.add_column(i64::try_from(object).expect("object id fits"));
        manager.finish_line().expect("finish line");
    }

    fn buffered_rows(manager: &CopyMgr<LimitedDeleter>) -> Option<usize> {
        manager.current.as_ref().map(CopyBuffer::row_count)
    }

    #[rstest]
    fn full_deleter_hands_the_buffer_over(notes: NotesDb) {
        let mut manager = notes.manager();
        let target = target();
        for object in 1..=LimitedDeleter::LIMIT {
            let object = i64::try_from(object).expect("object id fits");
            manager
                .delete_object(&target, &object, |deleter| deleter.pending += 1)
                .expect("queue delete");
        }
        assert!(manager.current.is_some(), "buffer kept below the limit");

        manager
            .delete_object(&target, &99, |deleter| deleter.pending += 1)
            .expect("queue delete");
        assert!(manager.current.is_none(), "full deleter flushed the buffer");
        manager.finish().expect("finish");
    }

    #[rstest]
    fn row_threshold_hands_the_buffer_over(notes: NotesDb) {
        let mut manager = notes.manager();
        let target = target();
        for object in 0..MAX_BUFFERED_ROWS {
            push_note(&mut manager, &target, object);
        }
        assert_eq!(buffered_rows(&manager), Some(MAX_BUFFERED_ROWS));

        push_note(&mut manager, &target, MAX_BUFFERED_ROWS);
        assert_eq!(buffered_rows(&manager), None);
        assert!(manager.pending_objects.is_empty());

        push_note(&mut manager, &target, MAX_BUFFERED_ROWS + 1);
        manager.sync().expect("sync");
        let expected = i64::try_from(MAX_BUFFERED_ROWS + 2).expect("row count fits");
        assert_eq!(notes.count(), expected);
        manager.finish().expect("finish");
    }
}
