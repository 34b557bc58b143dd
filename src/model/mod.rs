pub mod account;
pub mod book;
pub mod category;
pub mod commerce;
