//! Output diffing and emission
//!
//! Only outputs whose value moved since the last successful write reach the
//! sink. Per cycle the order is: queued one-shot actions, keyboard levels,
//! joystick axes, joystick buttons, then exactly one `Sync`.

use crate::error::{CycleError, EmissionError};
use crate::output::{OutputEvent, OutputState};
use crate::profile::AxisRange;
use async_trait::async_trait;

/// Destination for output events (the virtual input device)
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: &OutputEvent) -> std::io::Result<()>;
}

/// Sink that keeps every event in memory; optionally fails once a given
/// number of events has been accepted
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<OutputEvent>,
    pub fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(count: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_after: Some(count),
        }
    }

    /// Take the recorded events, leaving the sink empty
    pub fn take(&mut self) -> Vec<OutputEvent> {
        std::mem::take(&mut self.events)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&mut self, event: &OutputEvent) -> std::io::Result<()> {
        if self.fail_after.is_some_and(|n| self.events.len() >= n) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink closed",
            ));
        }
        self.events.push(event.clone());
        Ok(())
    }
}

/// Writes the changed part of an [`OutputState`] to a sink
#[derive(Debug, Clone, Copy)]
pub struct DiffEmitter {
    range: AxisRange,
}

impl DiffEmitter {
    pub fn new(range: AxisRange) -> Self {
        Self { range }
    }

    /// Emit one cycle. Returns the number of events written, `Sync` included.
    ///
    /// On failure, shadows of everything already written are committed and
    /// unsent one-shot actions stay queued; no `Sync` is sent.
    pub async fn emit(
        &self,
        out: &mut OutputState,
        sink: &mut (dyn EventSink + '_),
    ) -> Result<usize, CycleError> {
        let mut written = 0;

        while let Some(action) = out.pending.front() {
            let event = OutputEvent::from(action.clone());
            send(sink, event, &mut written).await?;
            out.pending.pop_front();
        }

        let keys: Vec<_> = out.keyboard.changed().collect();
        for (key, value) in keys {
            send(sink, OutputEvent::Key { key, value }, &mut written).await?;
            out.keyboard.commit(key, value);
        }

        let axes: Vec<_> = out.axes.changed().collect();
        for (axis, value) in axes {
            let scaled = self.range.scale(value);
            // Moves below device resolution are absorbed without an event
            let previous = out.axes.emitted(axis).map(|v| self.range.scale(v));
            if previous != Some(scaled) {
                send(sink, OutputEvent::Axis { axis, value: scaled }, &mut written).await?;
            }
            out.axes.commit(axis, value);
        }

        let buttons: Vec<_> = out.buttons.changed().collect();
        for (button, value) in buttons {
            send(sink, OutputEvent::Button { button, value }, &mut written).await?;
            out.buttons.commit(button, value);
        }

        send(sink, OutputEvent::Sync, &mut written).await?;
        Ok(written)
    }
}

async fn send(
    sink: &mut (dyn EventSink + '_),
    event: OutputEvent,
    written: &mut usize,
) -> Result<(), CycleError> {
    match sink.emit(&event).await {
        Ok(()) => {
            *written += 1;
            Ok(())
        }
        Err(source) => Err(CycleError::Emission {
            emitted: *written,
            source: EmissionError { event, source },
        }),
    }
}
