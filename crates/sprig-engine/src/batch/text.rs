use crate::coords::Vec2;
use crate::gpu::GpuContext;
use crate::paint::Color;

use super::sprite_batch::SpriteBatch;
use super::BatchError;

/// Placement of a run of text.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextTransform {
    /// Top-left of the first line's layout box, before the ascent shift.
    pub position: Vec2,
    pub origin: Vec2,
    pub scale: Vec2,
    /// Degrees.
    pub rotation: f32,
}

impl Default for TextTransform {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            origin: Vec2::zero(),
            scale: Vec2::one(),
            rotation: 0.0,
        }
    }
}

impl TextTransform {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }
}

/// Font collaborator that turns a string into quads.
///
/// Implementations enqueue glyphs through the batch's regular draw
/// operations, so they share its shader, matrices and flush policy.
pub trait GlyphLayout<G: GpuContext> {
    /// Distance from the top of the line box to the baseline.
    fn ascent(&self) -> f32;

    fn enqueue(
        &self,
        batch: &mut SpriteBatch<G>,
        text: &str,
        transform: &TextTransform,
        color: Color,
    ) -> Result<(), BatchError>;
}

impl<G: GpuContext> SpriteBatch<G> {
    /// Draws `text` through `layout`.
    ///
    /// Fails with `InvalidState` unless the batch is drawing. `None` color or
    /// empty text then draws nothing. Pending sprite geometry is flushed
    /// first unless [`set_lock_submit`](Self::set_lock_submit) is on.
    pub fn draw_string<L: GlyphLayout<G> + ?Sized>(
        &mut self,
        layout: &L,
        text: &str,
        transform: TextTransform,
        color: Option<Color>,
    ) -> Result<(), BatchError> {
        if !self.is_drawing() {
            return Err(BatchError::InvalidState {
                op: "draw_string",
                state: self.state(),
            });
        }
        let Some(color) = color else { return Ok(()) };
        if text.is_empty() {
            return Ok(());
        }

        if !self.is_lock_submit() {
            self.flush()?;
        }

        let mut transform = transform;
        transform.position.y -= layout.ascent();
        layout.enqueue(self, text, &transform, color)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::batch::{BatchConfig, TextureId, TextureRegion};
    use crate::gpu::HeadlessGpu;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, TextTransform)>>,
    }

    impl GlyphLayout<HeadlessGpu> for Recorder {
        fn ascent(&self) -> f32 {
            12.0
        }

        fn enqueue(
            &self,
            _batch: &mut SpriteBatch<HeadlessGpu>,
            text: &str,
            transform: &TextTransform,
            _color: Color,
        ) -> Result<(), BatchError> {
            self.calls.borrow_mut().push((text.to_owned(), *transform));
            Ok(())
        }
    }

    fn drawing_batch() -> SpriteBatch<HeadlessGpu> {
        let mut batch = SpriteBatch::new(HeadlessGpu::new(), BatchConfig::default()).unwrap();
        batch.begin().unwrap();
        batch
    }

    #[test]
    fn empty_text_and_missing_color_are_no_ops() {
        let layout = Recorder::default();
        let mut batch = drawing_batch();
        batch.draw_string(&layout, "", TextTransform::default(), Some(Color::WHITE)).unwrap();
        batch.draw_string(&layout, "hi", TextTransform::default(), None).unwrap();
        assert!(layout.calls.borrow().is_empty());
    }

    #[test]
    fn y_is_raised_by_ascent() {
        let layout = Recorder::default();
        let mut batch = drawing_batch();
        batch.draw_string(&layout, "hi", TextTransform::at(4.0, 30.0), Some(Color::WHITE)).unwrap();

        let calls = layout.calls.borrow();
        assert_eq!(calls[0].0, "hi");
        assert_eq!(calls[0].1.position, Vec2::new(4.0, 18.0));
    }

    #[test]
    fn pending_sprites_flush_unless_locked() {
        let tex = TextureRegion::new(TextureId(1), 8.0, 8.0);
        let layout = Recorder::default();
        let mut batch = drawing_batch();

        batch.draw(&tex, 0.0, 0.0).unwrap();
        batch.draw_string(&layout, "a", TextTransform::default(), Some(Color::WHITE)).unwrap();
        assert_eq!(batch.gpu().draw_count(), 1);

        batch.set_lock_submit(true);
        batch.draw(&tex, 0.0, 0.0).unwrap();
        batch.draw_string(&layout, "b", TextTransform::default(), Some(Color::WHITE)).unwrap();
        assert_eq!(batch.gpu().draw_count(), 1);
        assert_eq!(batch.pending_quads(), 1);
    }

    #[test]
    fn text_outside_begin_is_rejected() {
        let layout = Recorder::default();
        let mut batch = drawing_batch();
        batch.end().unwrap();
        let err = batch
            .draw_string(&layout, "x", TextTransform::default(), Some(Color::WHITE))
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidState { op: "draw_string", .. }));
    }

    #[test]
    fn text_before_first_begin_is_rejected() {
        let layout = Recorder::default();
        let mut batch = SpriteBatch::new(HeadlessGpu::new(), BatchConfig::default()).unwrap();
        let err = batch.draw_string(&layout, "x", TextTransform::default(), None).unwrap_err();
        assert!(matches!(
            err,
            BatchError::InvalidState {
                op: "draw_string",
                state: crate::batch::BatchState::Unloaded
            }
        ));
        assert!(layout.calls.borrow().is_empty());
    }
}
