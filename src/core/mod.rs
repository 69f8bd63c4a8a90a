pub mod dispatch;
pub mod errors;
pub mod models;
pub mod scope;
pub mod services;
pub mod traits;
