pub mod category;
pub mod purchase;
pub mod shopping_list;
