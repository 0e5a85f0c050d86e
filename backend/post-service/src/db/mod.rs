/// Database access layer
///
/// Repository modules hold the SQL for each table; transactional multi-table
/// updates (like toggling, notification writes) live in the service layer.
pub mod comment_repo;
pub mod like_repo;
pub mod post_repo;
pub mod user_repo;
