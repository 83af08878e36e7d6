use tokio::sync::{mpsc, oneshot};
use transq::{TranslateError, WorkItem};

/// A message sent from the worker pool to an individual worker task.
#[derive(Debug)]
pub enum WorkRequest {
    /// Translate one line and record the result.
    ///
    /// - `item`: The line and its target language.
    /// - `done`: Completion channel for the batch the line belongs to. The
    ///   dispatcher holds the receiving end and treats the channel closing as
    ///   the batch's join barrier.
    Translate {
        item: WorkItem,
        done: mpsc::Sender<LineOutcome>,
    },

    /// Request the worker to shut down.
    ///
    /// - `response`: One-shot channel for acknowledging that the worker has
    ///   left its loop.
    Shutdown { response: oneshot::Sender<()> },
}

/// What happened to a single line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// The translation was appended to the result buffer.
    Translated,
    /// The translation call failed; the line is lost for this submission.
    Failed(TranslateError),
    /// The daemon began shutting down before the call was made.
    Cancelled,
}
