pub mod count_objects_use_case;
pub mod count_report;
pub mod pipeline_logger;
