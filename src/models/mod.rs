pub mod appointment;
pub mod employee;
pub mod enums;
pub mod facility;
pub mod filters;
pub mod insurance;
pub mod invoice;
pub mod patient;

pub use appointment::*;
pub use employee::*;
pub use enums::*;
pub use facility::*;
pub use filters::*;
pub use insurance::*;
pub use invoice::*;
pub use patient::*;
