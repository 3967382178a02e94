mod diet;
mod diet_state;
mod food;
mod meal_category;
mod meal_entry;

pub use diet::Diet;
pub use diet_state::{DietState, DEFAULT_HYDRATION_GOAL_ML, DIET_SLOTS};
pub use food::FoodRef;
pub use meal_category::{default_categories, MealCategory, MealCategoryPatch, MAX_MEAL_CATEGORIES};
pub use meal_entry::{Macros, MealEntry};
