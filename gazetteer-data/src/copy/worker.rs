//! Background thread that owns the database connection.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use rusqlite::{Connection, params_from_iter};

use super::{CopyBuffer, Deleter, TransportError};

enum Command<D> {
    Copy(CopyBuffer<D>),
    Sync(Sender<Result<(), TransportError>>),
    Finish,
}

/// Writes copy buffers on a dedicated thread, in the order they are sent.
///
/// The first failure is kept and reported by the next [`CopyWorker::sync`]
/// or [`CopyWorker::finish`]. Buffers arriving after a failure and before
/// that report are discarded.
pub struct CopyWorker<D: Deleter> {
    sender: Sender<Command<D>>,
    handle: Option<JoinHandle<Result<(), TransportError>>>,
}

impl<D: Deleter> std::fmt::Debug for CopyWorker<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyWorker")
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl<D: Deleter> CopyWorker<D> {
    /// Start a worker that takes ownership of `connection`.
    pub fn spawn(connection: Connection) -> Result<Self, TransportError> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("gazetteer-copy".into())
            .spawn(move || run(connection, &receiver))
            .map_err(|source| TransportError::WorkerSpawn { source })?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Queue a buffer for writing.
    pub fn send(&self, buffer: CopyBuffer<D>) -> Result<(), TransportError> {
        self.sender
            .send(Command::Copy(buffer))
            .map_err(|_| TransportError::WorkerGone)
    }

    /// Wait until every buffer sent so far has landed.
    pub fn sync(&self) -> Result<(), TransportError> {
        let (reply, outcome) = mpsc::channel();
        self.sender
            .send(Command::Sync(reply))
            .map_err(|_| TransportError::WorkerGone)?;
        outcome.recv().map_err(|_| TransportError::WorkerGone)?
    }

    /// Drain the queue and stop the thread.
    pub fn finish(mut self) -> Result<(), TransportError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if self.sender.send(Command::Finish).is_err() {
            debug!("copy worker stopped before shutdown");
        }
        handle.join().map_err(|_| TransportError::WorkerPanicked)?
    }
}

impl<D: Deleter> Drop for CopyWorker<D> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("copy worker stopped with an unreported error: {err}");
        }
    }
}

fn run<D: Deleter>(
    mut connection: Connection,
    commands: &Receiver<Command<D>>,
) -> Result<(), TransportError> {
    let mut failure = None;
    let mut written = 0_usize;
    for command in commands {
        match command {
            Command::Copy(buffer) => {
                if failure.is_some() {
                    warn!(
                        "discarding {} rows for {} after an earlier failure",
                        buffer.row_count(),
                        buffer.target().name()
                    );
                    continue;
                }
                match write_buffer(&mut connection, buffer) {
                    Ok(rows) => written += rows,
                    Err(err) => failure = Some(err),
                }
            }
            Command::Sync(reply) => {
                let outcome = failure.take().map_or(Ok(()), Err);
                if reply.send(outcome).is_err() {
                    debug!("sync requester went away");
                }
            }
            Command::Finish => break,
        }
    }
    debug!("copy worker finished after writing {written} rows");
    failure.map_or(Ok(()), Err)
}

fn write_buffer<D: Deleter>(
    connection: &mut Connection,
    mut buffer: CopyBuffer<D>,
) -> Result<usize, TransportError> {
    let transaction = connection
        .transaction()
        .map_err(TransportError::sqlite("begin a copy transaction"))?;

    if buffer.deleter().has_data() {
        let table = buffer.target().name().to_owned();
        let column = buffer.target().id_column().to_owned();
        buffer
            .deleter_mut()
            .delete_rows(&table, &column, &transaction)?;
    }

    if !buffer.rows().is_empty() {
        let mut statement = transaction
            .prepare_cached(&buffer.target().insert_sql())
            .map_err(TransportError::sqlite("prepare the row insert"))?;
        for row in buffer.rows() {
            statement
                .execute(params_from_iter(row.iter()))
                .map_err(TransportError::sqlite("insert a row"))?;
        }
    }

    transaction
        .commit()
        .map_err(TransportError::sqlite("commit a copy transaction"))?;
    Ok(buffer.row_count())
}
