pub mod response;

pub use response::{not_found_error, session_to_dto, snapshot_to_dto};
