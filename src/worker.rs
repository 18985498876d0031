//! Engine worker: takes inputs from the gate and runs one cycle each

use ps3pie_core::emitter::EventSink;
use ps3pie_core::engine::Engine;
use ps3pie_core::error::CycleError;
use ps3pie_core::gate::{Input, ReportInbox};
use tracing::{debug, info, trace, warn};

/// Counters kept by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub cycles: u64,
    pub decode_errors: u64,
    pub emission_errors: u64,
    pub calibrations: u64,
}

/// Process inputs until every gate is dropped, then hand the sink back
pub async fn run_worker<S: EventSink>(
    mut engine: Engine,
    mut inbox: ReportInbox,
    mut sink: S,
) -> (S, WorkerStats) {
    let mut stats = WorkerStats::default();
    debug!("Worker started");

    while let Some((input, _busy)) = inbox.recv().await {
        if input == Input::Disconnected {
            info!("Controller disconnected, releasing outputs");
        }

        stats.cycles += 1;
        match engine.process(&input, &mut sink).await {
            Ok(report) => {
                trace!("Cycle wrote {} events", report.events);
                if let Some(Ok(())) = report.calibration {
                    stats.calibrations += 1;
                }
            }
            Err(CycleError::Decode(e)) => {
                stats.decode_errors += 1;
                warn!("Report ignored: {e}");
            }
            Err(e) => {
                stats.emission_errors += 1;
                warn!("Cycle failed: {e}");
            }
        }
    }

    info!("Report channel closed, worker exiting");
    (sink, stats)
}
