pub mod book_router;
pub mod category_router;
pub mod user_router;
