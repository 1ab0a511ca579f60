//! Debounced values
//!
//! A [`Debouncer`] turns a rapidly changing input into a settled output that
//! only moves after the input has been quiet for a fixed window. Pushing never
//! blocks; a background task owns the timer and publishes through a `watch`
//! channel. [`SearchInput`] layers the search box rules on top.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Default quiescence window
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(500);

type Gate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

enum Input<T> {
    /// Restart the window with this value
    Debounced(T),
    /// Publish now, dropping anything pending
    Immediate(T),
}

/// Delays propagation of a value until it stops changing
///
/// The settled output is always a value that was pushed at some point; equal
/// consecutive settled values do not produce a change notification. Dropping
/// the debouncer cancels any pending value.
///
/// # Example
///
/// ```no_run
/// use app_state::debounce::Debouncer;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let debouncer = Debouncer::new(String::new(), Duration::from_millis(500));
///     let mut settled = debouncer.subscribe();
///
///     debouncer.push("o".to_string());
///     debouncer.push("ox".to_string());
///
///     settled.changed().await.unwrap();
///     assert_eq!(*settled.borrow(), "ox");
/// }
/// ```
pub struct Debouncer<T> {
    input_tx: mpsc::UnboundedSender<Input<T>>,
    output_rx: watch::Receiver<T>,
    window: Duration,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a debouncer with an initial settled value
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(initial: T, window: Duration) -> Self {
        Self::spawn(initial, window, None)
    }

    /// Create a debouncer that drops settled values rejected by `gate`
    pub fn with_gate(
        initial: T,
        window: Duration,
        gate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::spawn(initial, window, Some(Arc::new(gate)))
    }

    fn spawn(initial: T, window: Duration, gate: Option<Gate<T>>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = watch::channel(initial);
        let task = tokio::spawn(settle(input_rx, output_tx, window, gate));

        Self {
            input_tx,
            output_rx,
            window,
            task,
        }
    }

    /// Feed a new input value
    pub fn push(&self, value: T) {
        let _ = self.input_tx.send(Input::Debounced(value));
    }

    /// Publish a value immediately, discarding any pending input
    pub fn flush_with(&self, value: T) {
        let _ = self.input_tx.send(Input::Immediate(value));
    }

    /// Subscribe to settled values
    ///
    /// The returned receiver has already seen the current value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        let mut rx = self.output_rx.clone();
        rx.borrow_and_update();
        rx
    }

    /// Current settled value
    pub fn current(&self) -> T {
        self.output_rx.borrow().clone()
    }

    /// Quiescence window
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn settle<T>(
    mut input_rx: mpsc::UnboundedReceiver<Input<T>>,
    output_tx: watch::Sender<T>,
    window: Duration,
    gate: Option<Gate<T>>,
) where
    T: PartialEq,
{
    let mut pending: Option<T> = None;

    loop {
        let input = match pending.take() {
            None => match input_rx.recv().await {
                Some(input) => input,
                None => return,
            },
            Some(value) => {
                tokio::select! {
                    input = input_rx.recv() => match input {
                        Some(input) => input,
                        None => return,
                    },
                    _ = sleep(window) => {
                        if gate.as_ref().map_or(true, |accept| accept(&value)) {
                            publish(&output_tx, value);
                        }
                        continue;
                    }
                }
            }
        };

        match input {
            Input::Debounced(value) => pending = Some(value),
            Input::Immediate(value) => publish(&output_tx, value),
        }
    }
}

fn publish<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

// =============================================================================
// Search Input
// =============================================================================

/// Search box text, debounced
///
/// Settled text is emitted when it is longer than `min_query_length`
/// characters or empty (so clearing the box always propagates). `clear`
/// bypasses the window.
pub struct SearchInput {
    debouncer: Debouncer<String>,
    min_query_length: usize,
}

impl SearchInput {
    /// Create a search input with a quiescence window and minimum query length
    pub fn new(window: Duration, min_query_length: usize) -> Self {
        let debouncer = Debouncer::with_gate(String::new(), window, move |query: &String| {
            query.is_empty() || query.chars().count() > min_query_length
        });

        Self {
            debouncer,
            min_query_length,
        }
    }

    /// Text changed
    pub fn set_text(&self, text: impl Into<String>) {
        self.debouncer.push(text.into());
    }

    /// Clear the box; the empty query is emitted immediately
    pub fn clear(&self) {
        self.debouncer.flush_with(String::new());
    }

    /// Subscribe to settled queries
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.debouncer.subscribe()
    }

    /// Last settled query
    pub fn query(&self) -> String {
        self.debouncer.current()
    }

    /// Minimum length a non-empty query must exceed
    pub fn min_query_length(&self) -> usize {
        self.min_query_length
    }
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new(DEFAULT_QUIESCENCE, 0)
    }
}
