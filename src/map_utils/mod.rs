pub mod composition;
pub mod manager;
pub mod map;
pub mod record;
