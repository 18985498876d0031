//! One processing cycle: decode, map, emit

use crate::emitter::{DiffEmitter, EventSink};
use crate::error::{CalibrationFault, CycleError};
use crate::gate::Input;
use crate::mapper::Mapper;
use crate::output::OutputState;
use crate::profile::Profile;
use crate::report;
use crate::snapshot::ControllerSnapshot;
use std::sync::Arc;

/// Summary of a completed cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Events written, `Sync` included
    pub events: usize,
    /// Set when the calibration chord fired
    pub calibration: Option<Result<(), CalibrationFault>>,
}

/// Owns the mapper and the output state for one controller
pub struct Engine {
    mapper: Mapper,
    emitter: DiffEmitter,
    output: OutputState,
}

impl Engine {
    pub fn new(profile: Arc<Profile>) -> Self {
        let emitter = DiffEmitter::new(profile.axis_range);
        let mapper = Mapper::new(profile);
        let output = mapper.initial_output();
        Self {
            mapper,
            emitter,
            output,
        }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn output(&self) -> &OutputState {
        &self.output
    }

    /// Run one cycle for an input from the gate
    ///
    /// A report that fails to decode changes nothing and emits nothing.
    pub async fn process(
        &mut self,
        input: &Input,
        sink: &mut (dyn EventSink + '_),
    ) -> Result<CycleReport, CycleError> {
        match input {
            Input::Report(data) => {
                let snapshot = report::decode(data)?;
                self.process_snapshot(&snapshot, sink).await
            }
            Input::Disconnected => {
                let outcome = self.mapper.release_all(&mut self.output);
                self.finish(outcome.calibration, sink).await
            }
        }
    }

    /// Run one cycle for an already decoded snapshot
    pub async fn process_snapshot(
        &mut self,
        snapshot: &ControllerSnapshot,
        sink: &mut (dyn EventSink + '_),
    ) -> Result<CycleReport, CycleError> {
        let outcome = self.mapper.map(snapshot, &mut self.output);
        self.finish(outcome.calibration, sink).await
    }

    async fn finish(
        &mut self,
        calibration: Option<Result<(), CalibrationFault>>,
        sink: &mut (dyn EventSink + '_),
    ) -> Result<CycleReport, CycleError> {
        let events = self.emitter.emit(&mut self.output, sink).await?;
        Ok(CycleReport {
            events,
            calibration,
        })
    }
}
