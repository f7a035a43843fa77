//! Progress reporting for sort and restore runs.

/// Callback invoked with `(completed, total)`, synchronously on the thread
/// running the engine. `total == 0` means there is nothing to do.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

/// Wraps an optional callback so the engines can report unconditionally.
pub(crate) struct Progress<'a> {
    callback: Option<ProgressFn<'a>>,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(callback: Option<ProgressFn<'a>>) -> Self {
        Self { callback }
    }

    pub(crate) fn report(&mut self, completed: usize, total: usize) {
        if let Some(callback) = self.callback.as_mut() {
            callback(completed, total);
        }
    }
}
