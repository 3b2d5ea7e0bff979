use std::future::Future;
use iced_futures::{Executor, MaybeSend};
use tokio::runtime::{Builder, Runtime};

/// Runs iced commands and subscriptions on a multi-threaded tokio runtime, and enters that runtime
/// while the application is constructed so that tasks can be spawned from `Application::new`.
pub struct AppExecutor {
    runtime: Runtime,
}

impl Executor for AppExecutor {
    fn new() -> Result<Self, futures::io::Error> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("ble-esp32-worker")
            .build()?;

        Ok(AppExecutor { runtime })
    }

    fn spawn(&self, future: impl Future<Output = ()> + MaybeSend + 'static) {
        let _ = self.runtime.spawn(future);
    }

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.runtime.enter();
        f()
    }
}
