pub mod detection;
pub mod detection_decoder;
pub mod label_vocabulary;
pub mod object_detector;
pub mod suppressor;
