use board_core::schedule::DAILY_SCHEDULE;

use super::{ACTION_QUEUE, TRAFFIC};
use crate::actions::{ActionWorker, Collaborators};
use crate::clock::SystemClock;
use crate::collab::{
    NoopAmbientSensor, NoopIndicators, NoopSettingsStore, NoopTrafficSource, NoopUpdateCheck,
};
use crate::display::{MatrixDriver, SharedDisplay};

#[embassy_executor::task]
pub async fn run(display: &'static SharedDisplay<MatrixDriver<'static>>) -> ! {
    let mut worker = ActionWorker::new(
        ACTION_QUEUE.receiver(),
        SystemClock,
        &DAILY_SCHEDULE,
        &TRAFFIC,
        display,
        // deployments wire the transport, NVS, and indicator collaborators
        // here; the no-op stand-ins behave like a permanent outage
        Collaborators {
            source: NoopTrafficSource,
            settings: NoopSettingsStore,
            indicators: NoopIndicators,
            updates: NoopUpdateCheck,
            ambient: NoopAmbientSensor,
        },
    );
    worker.seed().await;
    worker.run().await
}
