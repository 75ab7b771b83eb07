mod model;
mod repository;

pub use model::UsageLogDB;
pub use repository::UsageLogRepository;
