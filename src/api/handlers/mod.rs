pub mod auth;

pub mod dashboard;
pub use self::dashboard::dashboard;

pub mod health;
pub use self::health::health;

pub mod users;
