//! Application wiring
//!
//! An [`Application`] owns one ticket registry, one completion store and
//! one local worker pool, shared by every query it runs. [`InitBuilder`]
//! loads configuration and builds one.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::driver::{PassOptions, QueryDriver, QueryFailure};
use crate::reducer::types::Compound;
use crate::reducer::TracingObserver;
use crate::tickets::{FinStore, TicketRegistry};
use crate::worker::runner::run_query;
use crate::worker::LocalWorker;
use crate::workflows::WorkflowDocument;

/// The Loom application instance
pub struct Application {
    pub config: Config,
    registry: Arc<TicketRegistry>,
    fin: Arc<FinStore>,
    worker: LocalWorker,
}

impl Application {
    /// Create a new Application instance (pure instantiation, no I/O)
    pub fn new(config: Config) -> Self {
        let worker = LocalWorker::new(config.worker.clone());
        Self {
            config,
            registry: Arc::new(TicketRegistry::new()),
            fin: Arc::new(FinStore::new()),
            worker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TicketRegistry> {
        &self.registry
    }

    pub fn fin(&self) -> &Arc<FinStore> {
        &self.fin
    }

    pub fn worker(&self) -> &LocalWorker {
        &self.worker
    }

    /// Pass settings from config, logging reducer events through tracing
    pub fn pass_options(&self) -> PassOptions {
        PassOptions::default()
            .with_max_depth(self.config.reducer.max_depth)
            .with_observer(Arc::new(TracingObserver))
    }

    /// Driver sharing this application's registry and store
    pub fn driver(&self) -> QueryDriver {
        QueryDriver::new(Arc::clone(&self.registry), Arc::clone(&self.fin))
            .with_options(self.pass_options())
    }

    /// Run `document` to completion on the local worker pool
    pub async fn run(&self, document: &WorkflowDocument) -> Result<Vec<Compound>, QueryFailure> {
        run_query(self, document).await
    }

    /// Kill running invocations and refuse new ones
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }
}

/// Options for initializing Loom
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Config file path (overrides default search)
    pub config_path: Option<PathBuf>,

    /// Worker concurrency (overrides config file and env vars)
    pub workers: Option<usize>,

    /// Build directory (overrides config file and env vars)
    pub build_dir: Option<PathBuf>,

    pub keep_work_dirs: Option<bool>,

    /// Ignore `LOOM_*` environment variables
    pub skip_env: bool,
}

/// Builder for constructing InitOptions
#[derive(Default)]
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.options.workers = Some(workers);
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.build_dir = Some(dir.into());
        self
    }

    pub fn keep_work_dirs(mut self, keep: bool) -> Self {
        self.options.keep_work_dirs = Some(keep);
        self
    }

    pub fn skip_env(mut self, skip: bool) -> Self {
        self.options.skip_env = skip;
        self
    }

    /// Load configuration and build the application
    pub fn init(self) -> Result<Application> {
        initialize(self.options)
    }
}

/// Load configuration with `options` layered on top and build an Application
pub fn initialize(options: InitOptions) -> Result<Application> {
    let config = Config::builder()
        .config_path(options.config_path)
        .skip_env(options.skip_env)
        .concurrency(options.workers)
        .build_dir(options.build_dir)
        .keep_work_dirs(options.keep_work_dirs)
        .build()?;

    tracing::debug!(
        workers = config.worker.concurrency,
        build_dir = %config.worker.build_dir.display(),
        "application initialized"
    );
    Ok(Application::new(config))
}
