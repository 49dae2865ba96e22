//! Per-file warning collection.
//!
//! Diagnostics raised while a file is converted (an unknown fence language,
//! an archive that cannot be linked) are gathered in a task-local list and
//! reported next to that file once it is done.

use std::cell::RefCell;

tokio::task_local! {
    static WARNINGS: RefCell<Vec<String>>;
}

/// Records a warning for the file currently being processed. Outside of
/// [`collect_warnings`] the warning is dropped.
pub fn collect(message: impl Into<String>) {
    let _ = WARNINGS.try_with(|warnings| {
        warnings.borrow_mut().push(message.into());
    });
}

/// Runs `f` with collection enabled, returning its output and the warnings
/// raised while it ran.
pub async fn collect_warnings<F, T>(f: F) -> (T, Vec<String>)
where
    F: std::future::Future<Output = T>,
{
    WARNINGS
        .scope(RefCell::new(Vec::new()), async {
            let result = f.await;
            let warnings = WARNINGS.with(|w| std::mem::take(&mut *w.borrow_mut()));
            (result, warnings)
        })
        .await
}

#[macro_export]
macro_rules! warn_entry {
    ($($arg:tt)*) => {
        $crate::warning::collect(format!($($arg)*))
    };
}
