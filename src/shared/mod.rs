pub mod ids;
pub mod logging;

pub use ids::{new_id, unix_timestamp, validate_identifier_value};
pub use logging::{append_engine_log_line, engine_log_path, EngineLog};
