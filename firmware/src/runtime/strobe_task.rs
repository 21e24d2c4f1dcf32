use super::{STROBE_GATE, STROBE_QUEUE};
use crate::display::{MatrixDriver, SharedDisplay};
use crate::strobe::StrobeEngine;

#[embassy_executor::task]
pub async fn run(display: &'static SharedDisplay<MatrixDriver<'static>>) -> ! {
    let engine = StrobeEngine::new(STROBE_QUEUE.receiver(), &STROBE_GATE, display);
    engine.run().await
}
