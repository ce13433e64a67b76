//! Task orchestration: clean, build, observe.
//!
//! The graph is fixed. Clean must finish before any transform starts, the
//! five transforms are independent of each other, and observing only begins
//! once every transform has reported.

use crate::build::{BuildContext, BuildReport, TransformResult};
use crate::server::{DevServer, ServerError};
use crate::transforms::{default_transforms, AssetTransform, TransformError};
use crate::watch::{WatchError, Watcher};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("build aborted: {0}")]
    Fatal(String),
    #[error("failed to set up transforms: {0}")]
    Setup(#[from] TransformError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("{0} task stopped: {1}")]
    Task(&'static str, String),
}

/// Run one transform, timing and logging the outcome.
pub fn execute(transform: &dyn AssetTransform) -> TransformResult {
    let kind = transform.kind();
    let start = Instant::now();
    match transform.run() {
        Ok(output) => {
            let result = TransformResult::completed(kind, output.written, start.elapsed())
                .with_unchanged(output.unchanged)
                .with_warnings(output.warnings);
            tracing::info!("{}", result.describe());
            result
        }
        Err(e) => {
            let result = TransformResult::failed(kind, e.to_string(), start.elapsed());
            tracing::error!("{}", result.describe());
            if e.is_fatal() {
                result.as_fatal()
            } else {
                result
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct TaskGraph {
    ctx: Arc<BuildContext>,
    transforms: Vec<Arc<dyn AssetTransform>>,
}

impl TaskGraph {
    /// Wire the default transforms for `ctx`.
    pub fn new(ctx: Arc<BuildContext>) -> Result<Self, GraphError> {
        let transforms = default_transforms(&ctx)?;
        Ok(Self { ctx, transforms })
    }

    /// Replace the transforms.
    pub fn with_transforms(mut self, transforms: Vec<Arc<dyn AssetTransform>>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Remove the destination root. A missing root is not an error.
    pub fn clean(&self) -> Result<(), GraphError> {
        let dest = self.ctx.dest_root();
        match std::fs::remove_dir_all(dest) {
            Ok(()) => {
                tracing::info!("cleaned {}", dest.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(GraphError::Clean { path: dest.to_path_buf(), source }),
        }
    }

    /// Run every transform on the blocking pool and wait for all of them.
    ///
    /// A failing or panicking transform is reported in the result and does
    /// not affect the others.
    pub async fn build(&self) -> BuildReport {
        let start = Instant::now();
        let tasks = self.transforms.iter().map(|transform| {
            let transform = Arc::clone(transform);
            let kind = transform.kind();
            async move {
                let started = Instant::now();
                match tokio::task::spawn_blocking(move || execute(transform.as_ref())).await {
                    Ok(result) => result,
                    Err(e) => {
                        let message = if e.is_panic() {
                            format!("panicked: {}", panic_message(e.into_panic().as_ref()))
                        } else {
                            "cancelled".to_string()
                        };
                        let result = TransformResult::failed(kind, message, started.elapsed());
                        tracing::error!("{}", result.describe());
                        result
                    }
                }
            }
        });

        let mut report = BuildReport::new();
        for result in futures::future::join_all(tasks).await {
            report.add_result(result);
        }
        report.with_duration(start.elapsed())
    }

    /// Watch sources and serve the destination root until either stops.
    pub async fn observe(&self) -> Result<(), GraphError> {
        let watcher = Watcher::new(&self.ctx, self.transforms.clone());
        let server = DevServer::new(&self.ctx);

        let watch = async {
            tokio::task::spawn_blocking(move || watcher.run())
                .await
                .map_err(|e| GraphError::Task("watcher", e.to_string()))?
                .map_err(GraphError::from)
        };
        let serve = async { server.run().await.map_err(GraphError::from) };

        futures::future::try_join(watch, serve).await?;
        Ok(())
    }

    /// Clean, build, then observe.
    pub async fn run(&self) -> Result<(), GraphError> {
        self.clean()?;

        let report = self.build().await;
        for line in report.summary().lines() {
            tracing::info!("{}", line);
        }
        if let Some(fatal) = report.fatal {
            return Err(GraphError::Fatal(fatal));
        }

        self.observe().await
    }
}
