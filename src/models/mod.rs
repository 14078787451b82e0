pub mod audit_event;
pub mod biodata;
pub mod user;

pub use audit_event::AuditEvent;
pub use biodata::{Biodata, BiodataResponse};
pub use user::User;
