pub mod create_drink;
pub mod delete_drink;
pub mod list_drinks;
pub mod update_drink;

pub use create_drink::{CreateDrinkError, CreateDrinkUseCase};
pub use delete_drink::{DeleteDrinkError, DeleteDrinkUseCase};
pub use list_drinks::{ListDrinksError, ListDrinksUseCase};
pub use update_drink::{UpdateDrinkError, UpdateDrinkUseCase};
