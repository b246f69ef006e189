use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{Config, ErrorPolicy};
use crate::file::FileEvent;
use crate::report::{ErrorReport, ErrorReporter};
use crate::route::Lane;
use crate::sink::DirectorySink;

/// How one admitted file was handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Moved into a lane's output directory
    Moved { lane: Lane, to: PathBuf },
    /// Reported as unclassified and left in place
    Reported,
    /// Reported as unclassified and moved to the quarantine directory
    Quarantined { to: PathBuf },
    /// Delivery failed; the file is still in the input directory
    Failed,
}

/// Result of handling one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub path: PathBuf,
    pub lane: Lane,
    pub disposition: Disposition,
}

/// Lane consumers: the two output sinks and the error sink
pub struct Dispatcher {
    csv: DirectorySink,
    txt: DirectorySink,
    quarantine: Option<DirectorySink>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Dispatcher {
    pub fn new(config: &Config, reporter: Arc<dyn ErrorReporter>) -> Self {
        let timeout = config.move_timeout();
        let quarantine = match &config.error_policy {
            ErrorPolicy::Quarantine { dir } => {
                Some(DirectorySink::new(Lane::Error, dir).with_timeout(timeout))
            }
            ErrorPolicy::Repeat | ErrorPolicy::Once => None,
        };

        Self {
            csv: DirectorySink::new(Lane::Csv, &config.csv_dir).with_timeout(timeout),
            txt: DirectorySink::new(Lane::Txt, &config.txt_dir).with_timeout(timeout),
            quarantine,
            reporter,
        }
    }

    /// Handle one event on the given lane. Never fails: errors become reports.
    pub async fn dispatch(&self, lane: Lane, event: &FileEvent) -> Outcome {
        let disposition = match lane {
            Lane::Csv => self.deliver(&self.csv, event).await,
            Lane::Txt => self.deliver(&self.txt, event).await,
            Lane::Error => self.reject(event).await,
        };

        Outcome {
            path: event.path.clone(),
            lane,
            disposition,
        }
    }

    async fn deliver(&self, sink: &DirectorySink, event: &FileEvent) -> Disposition {
        match sink.deliver(event).await {
            Ok(to) => Disposition::Moved {
                lane: sink.lane(),
                to,
            },
            Err(err) => {
                warn!("Delivery of {} failed: {}", event.path.display(), err);
                self.reporter
                    .report(&ErrorReport::delivery_failed(&event.path, sink.lane(), &err));
                Disposition::Failed
            }
        }
    }

    async fn reject(&self, event: &FileEvent) -> Disposition {
        self.reporter
            .report(&ErrorReport::unclassified(&event.path, &event.extension));

        let Some(quarantine) = &self.quarantine else {
            return Disposition::Reported;
        };

        match quarantine.deliver(event).await {
            Ok(to) => {
                debug!("Quarantined {}", to.display());
                Disposition::Quarantined { to }
            }
            Err(err) => {
                self.reporter
                    .report(&ErrorReport::delivery_failed(&event.path, Lane::Error, &err));
                Disposition::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ChannelReporter, ErrorReason};
    use std::fs;
    use tempfile::TempDir;

    fn setup(policy: ErrorPolicy) -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_roots(tmp.path().join("in"), tmp.path().join("out"));
        config.error_policy = policy;
        fs::create_dir_all(&config.input_dir).unwrap();
        (tmp, config)
    }

    fn drop_file(config: &Config, name: &str) -> FileEvent {
        let path = config.input_dir.join(name);
        fs::write(&path, name).unwrap();
        FileEvent::from_path(path).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_csv() {
        let (_tmp, config) = setup(ErrorPolicy::Repeat);
        let (reporter, mut rx) = ChannelReporter::new();
        let dispatcher = Dispatcher::new(&config, Arc::new(reporter));

        let event = drop_file(&config, "report.csv");
        let outcome = dispatcher.dispatch(Lane::Csv, &event).await;

        assert_eq!(
            outcome.disposition,
            Disposition::Moved {
                lane: Lane::Csv,
                to: config.csv_dir.join("report.csv"),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_error_reports_and_leaves_file() {
        let (_tmp, config) = setup(ErrorPolicy::Repeat);
        let (reporter, mut rx) = ChannelReporter::new();
        let dispatcher = Dispatcher::new(&config, Arc::new(reporter));

        let event = drop_file(&config, "image.png");
        let outcome = dispatcher.dispatch(Lane::Error, &event).await;

        assert_eq!(outcome.disposition, Disposition::Reported);
        assert!(event.path.exists());
        let report = rx.try_recv().unwrap();
        assert_eq!(report.file, event.path);
        assert_eq!(
            report.reason,
            ErrorReason::Unclassified {
                extension: "png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_quarantine() {
        let tmp = TempDir::new().unwrap();
        let quarantine_dir = tmp.path().join("quarantine");
        let (_inner, config) = setup(ErrorPolicy::Quarantine {
            dir: quarantine_dir.clone(),
        });
        let (reporter, mut rx) = ChannelReporter::new();
        let dispatcher = Dispatcher::new(&config, Arc::new(reporter));

        let event = drop_file(&config, "image.png");
        let outcome = dispatcher.dispatch(Lane::Error, &event).await;

        assert_eq!(
            outcome.disposition,
            Disposition::Quarantined {
                to: quarantine_dir.join("image.png"),
            }
        );
        assert!(!event.path.exists());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_failure_reported() {
        let (_tmp, config) = setup(ErrorPolicy::Repeat);
        fs::create_dir_all(config.txt_dir.parent().unwrap()).unwrap();
        fs::write(&config.txt_dir, "blocks the directory").unwrap();
        let (reporter, mut rx) = ChannelReporter::new();
        let dispatcher = Dispatcher::new(&config, Arc::new(reporter));

        let event = drop_file(&config, "notes.txt");
        let outcome = dispatcher.dispatch(Lane::Txt, &event).await;

        assert_eq!(outcome.disposition, Disposition::Failed);
        assert!(event.path.exists());
        let report = rx.try_recv().unwrap();
        assert!(matches!(
            report.reason,
            ErrorReason::DeliveryFailed { lane: Lane::Txt, .. }
        ));
    }
}
