pub mod audit;
pub mod biodata;
pub mod users;
