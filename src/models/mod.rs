pub mod books;
pub mod reviews;
pub mod user;
