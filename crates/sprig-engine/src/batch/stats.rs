/// Draw-call counters. Profiling only; nothing in the batch depends on them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Flushes since the last `begin()`.
    pub render_calls: u32,
    /// Flushes over the batch's lifetime.
    pub total_render_calls: u64,
    /// Largest number of quads submitted by a single flush.
    pub max_sprites_in_batch: usize,
    /// Quads submitted by the most recent flush.
    pub last_flush_quads: usize,
}

impl BatchStats {
    pub(crate) fn begin_frame(&mut self) {
        self.render_calls = 0;
    }

    pub(crate) fn record_flush(&mut self, quads: usize) {
        self.render_calls += 1;
        self.total_render_calls += 1;
        self.last_flush_quads = quads;
        self.max_sprites_in_batch = self.max_sprites_in_batch.max(quads);
    }
}
