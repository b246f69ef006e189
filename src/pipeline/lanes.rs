use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::dispatch::{Dispatcher, Outcome};
use crate::file::FileEvent;
use crate::route::Lane;

/// One channel and one worker task per lane
///
/// Workers consume their lane in send order and report each [`Outcome`] on
/// the completion channel. Lanes do not wait on each other.
pub struct LaneWorkers {
    csv: mpsc::UnboundedSender<FileEvent>,
    txt: mpsc::UnboundedSender<FileEvent>,
    error: mpsc::UnboundedSender<FileEvent>,
    handles: Vec<JoinHandle<()>>,
}

impl LaneWorkers {
    pub fn spawn(dispatcher: Arc<Dispatcher>, done: mpsc::UnboundedSender<Outcome>) -> Self {
        let mut handles = Vec::with_capacity(Lane::ALL.len());
        let mut spawn_lane = |lane: Lane| {
            let (tx, rx) = mpsc::unbounded_channel();
            handles.push(tokio::spawn(lane_worker(
                lane,
                dispatcher.clone(),
                rx,
                done.clone(),
            )));
            tx
        };

        let csv = spawn_lane(Lane::Csv);
        let txt = spawn_lane(Lane::Txt);
        let error = spawn_lane(Lane::Error);

        Self {
            csv,
            txt,
            error,
            handles,
        }
    }

    /// Queue an event on its lane. Hands the event back if the worker is gone.
    pub fn send(&self, lane: Lane, event: FileEvent) -> Result<(), FileEvent> {
        let tx = match lane {
            Lane::Csv => &self.csv,
            Lane::Txt => &self.txt,
            Lane::Error => &self.error,
        };
        tx.send(event).map_err(|err| err.0)
    }

    /// Close all lanes and wait for the workers to drain them
    pub async fn shutdown(self) {
        let Self {
            csv,
            txt,
            error,
            handles,
        } = self;
        drop((csv, txt, error));

        for handle in handles {
            if let Err(err) = handle.await {
                debug!("Lane worker ended abnormally: {}", err);
            }
        }
    }
}

async fn lane_worker(
    lane: Lane,
    dispatcher: Arc<Dispatcher>,
    mut rx: mpsc::UnboundedReceiver<FileEvent>,
    done: mpsc::UnboundedSender<Outcome>,
) {
    while let Some(event) = rx.recv().await {
        let outcome = dispatcher.dispatch(lane, &event).await;
        if done.send(outcome).is_err() {
            break;
        }
    }
    debug!("{} lane worker stopped", lane);
}
