//! Control task.
//!
//! Owns the control loop, and through it the joint pipeline and the servo bus. The
//! controller link publishes its newest event into [`CONTROLLER_INPUT`]; the task
//! picks it up at the next tick and keeps using it until a newer one arrives.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Ticker};
use esp_hal::uart::Uart;
use esp_hal::Blocking;
use log::info;

use crate::control::control_loop::ControlLoop;
use crate::robot::commands::InputEvent;
use crate::robot::config::CONTROL_PERIOD;
use crate::robot::servo::JointPipeline;
use crate::robot::sts::StsBus;

pub type ServoBus = StsBus<Uart<'static, Blocking>>;

/// Latest controller event. Older events are overwritten, never queued.
pub static CONTROLLER_INPUT: Signal<CriticalSectionRawMutex, InputEvent> = Signal::new();

#[embassy_executor::task]
pub async fn control_task(pipeline: JointPipeline<'static, ServoBus>) {
    let mut control = ControlLoop::new(pipeline);
    control.neutral();

    let mut latest = None;
    let mut ticker = Ticker::every(CONTROL_PERIOD);
    info!("[CONTROL_TASK] running every {} ms", CONTROL_PERIOD.as_millis());
    loop {
        if let Some(event) = CONTROLLER_INPUT.try_take() {
            latest = match event {
                InputEvent::Sample(sample) => Some(sample),
                InputEvent::Disconnected => None,
            };
        }
        control.tick(Instant::now(), latest);
        ticker.next().await;
    }
}
