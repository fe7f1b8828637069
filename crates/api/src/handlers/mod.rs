pub mod comparison;
pub mod layout;
pub mod submission;
pub mod threshold;
