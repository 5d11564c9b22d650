pub mod executor;
pub mod router;
