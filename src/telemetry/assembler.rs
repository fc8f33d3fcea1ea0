/// Splits the raw chunk stream into frames on a sentinel marker.
///
/// Torch redraws its whole screen once per sampling interval and always ends
/// the redraw with its interactive footer, so the footer text is a reliable
/// frame boundary. Transport chunks may split or merge lines arbitrarily;
/// the sentinel itself can straddle two chunks.
pub struct FrameAssembler {
    sentinel: String,
    buffer: String,
}

impl FrameAssembler {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            buffer: String::new(),
        }
    }

    /// Appends one chunk and returns every frame it completed, in arrival
    /// order. The sentinel is discarded; content after the last sentinel is
    /// kept as the start of the next frame. Without a sentinel the buffer
    /// just grows.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(idx) = self.buffer.find(&self.sentinel) {
            let rest = self.buffer.split_off(idx + self.sentinel.len());
            self.buffer.truncate(idx);
            frames.push(std::mem::replace(&mut self.buffer, rest));
        }
        frames
    }
}
