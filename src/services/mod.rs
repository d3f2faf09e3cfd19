pub mod accounts;
pub mod catalog;
pub mod covers;
pub mod reviews;
pub mod startup;
pub mod token;
