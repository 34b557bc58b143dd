pub mod auth_handler;
pub mod book_handler;
pub mod category_handler;
pub mod form;
