//! Q16.16 Fixed-Point Canvas Coordinates
//!
//! Draw operations carry canvas positions as fixed-point integers so that the
//! drawing stored in a round is integer-only, `Eq` comparable, and encodes to
//! the same bytes on every platform.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Canvas space: 0.0 (left/top) to 1.0 (right/bottom)         │
//! │  Precision: 1/65536 of the canvas edge                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Left/top edge of the canvas.
pub const CANVAS_MIN: Fixed = 0;

/// Right/bottom edge of the canvas.
pub const CANVAS_MAX: Fixed = FIXED_ONE;

/// Convert a float to fixed-point.
///
/// # Warning
/// Only use at input capture (pointer position) or in tests. Never in the reducer.
///
/// # Example
/// ```
/// use drawduel::core::fixed::{to_fixed, FIXED_ONE};
/// const QUARTER: i32 = to_fixed(0.25);
/// assert_eq!(QUARTER, FIXED_ONE / 4);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Check that a coordinate lies on the canvas (edges inclusive).
#[inline]
pub fn is_on_canvas(f: Fixed) -> bool {
    (CANVAS_MIN..=CANVAS_MAX).contains(&f)
}

// =============================================================================
// TESTS
// =============================================================================
