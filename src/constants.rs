//! Game constants and face/bitmask helpers.
//!
//! Faces are indexed 0..6. Face 0 is the wild face (the worm), worth 5 points
//! per die; faces 1..=5 are worth their own index. The chosen-faces set is a
//! 6-bit mask where bit `i` is set once face `i` has been banked this turn.

/// Number of die faces. Face-count vectors always have this length.
pub const N_FACES: usize = 6;

/// Index of the wild face.
pub const WILD_FACE: usize = 0;

/// Points per die for the wild face.
pub const WILD_VALUE: u32 = 5;

/// Dice in the standard pool.
pub const DEFAULT_NUM_DICE: u8 = 8;

/// Lowest tile number in the standard game.
pub const DEFAULT_TILE_MIN: u32 = 21;

/// Worm values of tiles 21..=36 in the standard game.
pub const DEFAULT_TILE_VALUES: [f64; 16] = [
    1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0, 4.0,
];

/// Mask with every face bit set.
pub const ALL_FACES_MASK: u8 = (1 << N_FACES) - 1;

/// Points per die for each face index.
pub const FACE_VALUES: [u32; N_FACES] = [WILD_VALUE, 1, 2, 3, 4, 5];

/// Short labels used in reports ("W" for the wild face).
pub const FACE_LABELS: [&str; N_FACES] = ["W", "1", "2", "3", "4", "5"];

/// Points contributed by one die showing `face`.
#[inline(always)]
pub fn face_value(face: usize) -> u32 {
    FACE_VALUES[face]
}

/// Test whether `face` has been banked (bit `face` is set).
#[inline(always)]
pub fn is_face_chosen(chosen: u8, face: usize) -> bool {
    (chosen & (1 << face)) != 0
}

/// Set bit `face` in the chosen mask.
#[inline(always)]
pub fn with_face_chosen(chosen: u8, face: usize) -> u8 {
    chosen | (1 << face)
}
