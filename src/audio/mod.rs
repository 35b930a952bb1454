//! Narration mixing into a single timeline PCM track.

pub mod mix;
