pub mod constants;
pub mod counting_config;
pub mod frame;
pub mod model_resolver;
pub mod roi;
pub mod video_metadata;
