pub mod analysis;
pub mod credentials;
pub mod job;
pub mod short;
pub mod submission;
