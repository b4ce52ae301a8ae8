//! Drawing Operations
//!
//! The drawing of a round is an append-only list of [`DrawOp`]s. Replaying the
//! list from the start reproduces the canvas; `Undo` and `Clear` are ops like
//! any other so the list itself never shrinks.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, is_on_canvas};

/// Palette slot a stroke or fill uses.
///
/// The drawer's UI maps slots to concrete colors; the engine only
/// records which slot was picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum ColorType {
    /// Main ink color
    #[default]
    Primary,
    /// Alternate ink color
    Secondary,
    /// Canvas background (acts as an eraser)
    Background,
}

/// Brush diameter class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum BrushSize {
    /// Fine line
    Small,
    /// Default line
    #[default]
    Medium,
    /// Thick line
    Large,
}

/// One atomic stroke instruction.
///
/// Coordinates are Q16.16 fixed point in canvas space (`0..=FIXED_ONE`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawOp {
    /// Put the brush down.
    StartStroke {
        /// Palette slot
        color: ColorType,
        /// Brush size
        size: BrushSize,
        /// Canvas X
        x: Fixed,
        /// Canvas Y
        y: Fixed,
    },
    /// Drag the brush to a new point.
    ContinueStroke {
        /// Canvas X
        x: Fixed,
        /// Canvas Y
        y: Fixed,
    },
    /// Lift the brush.
    EndStroke,
    /// Flood fill from a point.
    Fill {
        /// Palette slot
        color: ColorType,
        /// Canvas X
        x: Fixed,
        /// Canvas Y
        y: Fixed,
    },
    /// Remove the most recent stroke or fill.
    Undo,
    /// Wipe the canvas.
    Clear,
}

impl DrawOp {
    /// Position carried by this op, if any.
    pub fn position(&self) -> Option<(Fixed, Fixed)> {
        match *self {
            DrawOp::StartStroke { x, y, .. }
            | DrawOp::ContinueStroke { x, y }
            | DrawOp::Fill { x, y, .. } => Some((x, y)),
            DrawOp::EndStroke | DrawOp::Undo | DrawOp::Clear => None,
        }
    }

    /// True when every coordinate of the op lies on the canvas.
    pub fn is_on_canvas(&self) -> bool {
        match self.position() {
            Some((x, y)) => is_on_canvas(x) && is_on_canvas(y),
            None => true,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
