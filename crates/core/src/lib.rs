//! Counting a single object class inside a fixed region of interest, frame
//! by frame, from the raw output of an object-detection model.
pub mod annotation;
pub mod counting;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
