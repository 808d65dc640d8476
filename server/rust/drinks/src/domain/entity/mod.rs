pub mod drink;

pub use drink::{Drink, DrinkChanges, DrinkLong, DrinkShort, Ingredient, NewDrink};
