pub mod account_repo;
pub mod book_repo;
pub mod category_repo;
pub mod mongo;
pub mod repository_error;
