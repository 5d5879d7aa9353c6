//! A simple RAII timer for measuring the duration of a scope.

use std::time::Instant;

use crate::sinks::ConsensusMetricsSink;

/// Records a round tick's elapsed time to a [`ConsensusMetricsSink`] when
/// dropped, regardless of which branch the scope returns through.
pub struct Timer<'a> {
    sink: &'a dyn ConsensusMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn ConsensusMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink.observe_tick_duration(self.start.elapsed().as_secs_f64());
    }
}
