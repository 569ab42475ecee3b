pub mod attendance_cache;
pub mod db_utils;
pub mod login_registry;
