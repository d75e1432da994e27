pub mod frame_result;
pub mod roi_counter;
pub mod roi_selector;
pub mod target_class;
