//! Word Lists
//!
//! Every round offers the drawer one easy and one hard word. Words are
//! lowercase ASCII with no spaces so the letter hints index cleanly.

use crate::core::rng::DeterministicRng;

/// Short, concrete nouns.
pub const EASY_WORDS: &[&str] = &[
    "apple", "ball", "banana", "bed", "bird", "boat", "book", "bread", "bus",
    "cake", "car", "cat", "chair", "cloud", "cow", "cup", "dog", "door", "duck",
    "egg", "eye", "fish", "flower", "frog", "hat", "heart", "horse", "house",
    "key", "kite", "lamp", "leaf", "moon", "mouse", "nose", "pen", "pig", "pizza",
    "rain", "ring", "shoe", "snake", "sock", "spoon", "star", "sun", "table",
    "tree", "train", "umbrella",
];

/// Longer or more abstract words.
pub const HARD_WORDS: &[&str] = &[
    "accordion", "astronaut", "avalanche", "blueprint", "campfire", "carousel",
    "chandelier", "compass", "constellation", "dinosaur", "earthquake", "eclipse",
    "escalator", "fireworks", "glacier", "gravity", "hammock", "hourglass",
    "igloo", "jellyfish", "kangaroo", "labyrinth", "lighthouse", "lobster",
    "magnet", "mermaid", "microscope", "origami", "parachute", "penguin",
    "periscope", "platypus", "pyramid", "quicksand", "rainbow", "saxophone",
    "scarecrow", "skeleton", "submarine", "telescope", "tornado", "trampoline",
    "treasure", "unicorn", "vampire", "volcano", "waterfall", "windmill",
    "wizard", "zeppelin",
];

/// Pick an easy and a hard word.
pub fn pick_pair(rng: &mut DeterministicRng) -> (&'static str, &'static str) {
    // Both lists are non-empty constants
    let easy = rng.choose(EASY_WORDS).copied().unwrap_or("cat");
    let hard = rng.choose(HARD_WORDS).copied().unwrap_or("platypus");
    (easy, hard)
}

// =============================================================================
// TESTS
// =============================================================================
