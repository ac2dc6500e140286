//! Shared Runtime

use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Runtime};

/// Multi-thread runtime shared by the CLI commands.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .thread_name("hound-worker")
        .enable_all()
        .build()
        .expect("failed to build global runtime")
});

/// Run a future to completion on the shared runtime.
///
/// Must not be called from inside another runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    RUNTIME.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::block_on;

    #[test]
    fn test_block_on_drives_timers() {
        let out = block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            7
        });
        assert_eq!(out, 7);
    }
}
