//! Simulated power and thermal sensors.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use crate::error::WorkerError;
use crate::workers::{Worker, WorkerContext};

const VOLTAGE_RANGE: (f64, f64) = (10.0, 14.4);
const TEMP_RANGE: (f64, f64) = (30.0, 85.0);
const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Random-walk voltage and CPU temperature, published once per second.
#[derive(Debug)]
pub struct SensorsWorker {
    voltage: f64,
    cpu_temp: f64,
}

impl SensorsWorker {
    pub fn new() -> Self {
        Self {
            voltage: 12.5,
            cpu_temp: 45.0,
        }
    }

    /// Advances both readings by one noisy step and returns them rounded.
    fn sample(&mut self) -> (f64, f64) {
        let mut rng = rand::rng();
        self.voltage = walk(self.voltage, rng.random_range(-0.1..=0.1), VOLTAGE_RANGE);
        self.cpu_temp = walk(self.cpu_temp, rng.random_range(-1.0..=1.0), TEMP_RANGE);
        (round2(self.voltage), round2(self.cpu_temp))
    }
}

impl Default for SensorsWorker {
    fn default() -> Self {
        Self::new()
    }
}

fn walk(value: f64, delta: f64, (lo, hi): (f64, f64)) -> f64 {
    (value + delta).clamp(lo, hi)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait]
impl Worker for SensorsWorker {
    fn name(&self) -> &str {
        "sensors"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        info!(worker = ctx.name(), "sensor sampling started (simulated hardware)");

        while !ctx.is_stopping() {
            let (voltage, cpu_temp) = self.sample();
            ctx.store().set_volatile(|v| {
                v.voltage = voltage;
                v.cpu_temp = cpu_temp;
            });

            if rand::rng().random_bool(0.2) {
                info!(worker = ctx.name(), voltage, cpu_temp, "hardware status");
            }

            ctx.report_health();
            ctx.sleep(SAMPLE_PERIOD).await;
        }
        Ok(())
    }
}
