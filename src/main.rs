#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::future::pending;
use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{error, info, warn};
use quad_walker::robot::config::CALIBRATION;
use quad_walker::robot::servo::JointPipeline;
use quad_walker::robot::sts::StsBus;
use quad_walker::tasks::control_task::control_task;

esp_bootloader_esp_idf::esp_app_desc!();

/// The STS servos talk at 1 Mbaud.
const SERVO_BAUDRATE: u32 = 1_000_000;
/// Below this the servos brown out under load.
const LOW_SUPPLY_VOLTS: f32 = 6.5;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let p = esp_hal::init(config);

    let timer0 = TimerGroup::new(p.TIMG1);
    esp_hal_embassy::init(timer0.timer0);

    if let Err(e) = CALIBRATION.validate() {
        error!("calibration rejected: {e}");
        loop {
            pending::<()>().await;
        }
    }

    // servo bus: RX on GPIO18, TX on GPIO19
    let uart = Uart::new(p.UART1, UartConfig::default().with_baudrate(SERVO_BAUDRATE))
        .expect("Failed to initialize servo UART")
        .with_rx(p.GPIO18)
        .with_tx(p.GPIO19);

    let mut pipeline = JointPipeline::new(StsBus::new(uart), &CALIBRATION);
    let survey = pipeline.survey();
    for id in survey.missing.iter() {
        warn!("{id} did not answer");
    }
    if let Some(volts) = survey.voltage {
        if volts < LOW_SUPPLY_VOLTS {
            warn!("supply at {volts} V");
        }
    }

    info!("Starting quadruped walker...");
    spawner
        .spawn(control_task(pipeline))
        .expect("Fail spawning control task");

    loop {
        pending::<()>().await;
    }
}
