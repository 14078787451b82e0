pub mod metadata;
pub mod parser;

pub use parser::{FormData, UploadedFile};
