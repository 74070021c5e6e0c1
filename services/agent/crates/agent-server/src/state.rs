//! Shared handler state: the renderer, executor and cluster reader, all
//! built once at startup from `Config` and a single command runner.

use std::sync::Arc;

use crate::config::Config;
use crate::executor::Executor;
use crate::kube::KubeClient;
use crate::render::Renderer;
use crate::runner::CommandRunner;

pub struct AppState<R> {
    pub renderer: Renderer,
    pub executor: Executor<R>,
    pub kube: KubeClient<R>,
}

impl<R: CommandRunner> AppState<R> {
    pub fn new(config: &Config, runner: Arc<R>) -> Self {
        let executor = Executor::new(Arc::clone(&runner), &config.kubectl, &config.applied_dir);
        Self {
            renderer: Renderer::new(&config.templates_dir, executor.staging_dir()),
            executor,
            kube: KubeClient::new(runner, &config.kubectl),
        }
    }
}
