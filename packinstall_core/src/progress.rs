/// Staged progress sink fed by the installer.
///
/// Calls are notifications only; nothing an implementation does here changes
/// the course of an install.
pub trait ProgressHandler: Send + Sync {
    /// Starts a set of `count` tasks.
    fn new_task_set(&self, count: usize);
    /// Announces the next task set before its size is known.
    fn prepare_new_task_set(&self, label: &str);
    fn new_task(&self, label: &str);
    fn done(&self);
}

/// Discards all progress.
impl ProgressHandler for () {
    fn new_task_set(&self, _: usize) {}
    fn prepare_new_task_set(&self, _: &str) {}
    fn new_task(&self, _: &str) {}
    fn done(&self) {}
}
