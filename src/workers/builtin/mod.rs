//! # Built-in simulated workers.
//!
//! Stand-ins for the hardware units of a deployment. Each one honors the
//! worker contract and talks to its siblings only through the shared store:
//!
//! ```text
//! sensors ──► volatile.voltage / volatile.cpu_temp
//! camera  ──► frame queue ──► detector ──► volatile.person_detected ──► audio
//! producer ──► frame queue ──► consumer            (demo pair)
//! ```
//!
//! | identifier | type            |
//! |------------|-----------------|
//! | `sensors`  | [`SensorsWorker`]  |
//! | `camera`   | [`CameraWorker`]   |
//! | `detector` (alias `yolo`) | [`DetectorWorker`] |
//! | `audio`    | [`AudioWorker`]    |
//! | `producer` | [`ProducerWorker`] |
//! | `consumer` | [`ConsumerWorker`] |

mod audio;
mod camera;
mod demo;
mod detector;
mod sensors;

pub use audio::AudioWorker;
pub use camera::CameraWorker;
pub use demo::{ConsumerWorker, ProducerWorker};
pub use detector::DetectorWorker;
pub use sensors::SensorsWorker;

use crate::workers::WorkerCatalog;

pub(crate) fn register_all(catalog: &mut WorkerCatalog) {
    catalog
        .register("sensors", |_| Ok(Box::new(SensorsWorker::new())))
        .register("camera", |deps| Ok(Box::new(CameraWorker::new(&deps.settings.camera))))
        .register("detector", |_| Ok(Box::new(DetectorWorker::new())))
        .register("audio", |deps| Ok(Box::new(AudioWorker::new(&deps.settings.audio))))
        .register("producer", |_| Ok(Box::new(ProducerWorker::new())))
        .register("consumer", |_| Ok(Box::new(ConsumerWorker::new())));
    catalog.alias("yolo", "detector");
}
