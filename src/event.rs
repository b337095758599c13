use crate::math::Vec2f;

/// One pointer event of a drawing gesture, in surface-local pixels.
///
/// A gesture is delivered as `Down`, any number of `Move`s, then `Up`.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Down {
        /// Pointer position in surface coordinates.
        position: Vec2f,
    },
    Move {
        position: Vec2f,
    },
    Up,
}
