pub mod pii;
pub mod time;

pub use pii::Masked;
