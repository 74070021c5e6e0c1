//! Command implementations

pub mod cluster;
pub mod config;
pub mod hosts;
pub mod kube;
pub mod policy;
pub mod template;

use std::future::Future;

use crate::app::AppContext;
use crate::output::progress;

/// Await `fut` behind a spinner when the terminal is interactive.
pub(crate) async fn with_spinner<T>(app: &AppContext, msg: &str, fut: impl Future<Output = T>) -> T {
    let pb = (app.output.spinners() && !app.is_json()).then(|| progress::spinner(msg));
    let out = fut.await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    out
}
