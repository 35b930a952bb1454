//! Timeline builder: story + resolved assets -> ordered timed segments.

pub mod plan;
