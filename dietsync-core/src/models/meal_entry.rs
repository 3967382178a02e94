use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use uuid::Uuid;

use super::food::FoodRef;

/// A single food-and-quantity record assigned to a meal category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub id: String,
    pub food: FoodRef,
    pub quantity: f64,
    pub meal_category_id: String,
}

impl MealEntry {
    pub fn new(food: FoodRef, quantity: f64, meal_category_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            food,
            quantity,
            meal_category_id: meal_category_id.into(),
        }
    }

    /// Returns a copy of this entry carrying a newly generated id.
    pub fn with_fresh_id(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && self.food.is_valid() && is_valid_quantity(self.quantity)
    }

    /// Macros contributed by this entry.
    pub fn macros(&self) -> Macros {
        let factor = self.quantity / 100.0;
        Macros {
            kcal: self.food.kcal * factor,
            protein: self.food.protein * factor,
            carbs: self.food.carbs * factor,
            fat: self.food.fat * factor,
        }
    }
}

impl fmt::Display for MealEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.food, self.quantity, self.food.unit)
    }
}

pub(crate) fn is_valid_quantity(quantity: f64) -> bool {
    quantity.is_finite() && quantity > 0.0
}

/// Energy and macronutrient totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Macros {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl AddAssign for Macros {
    fn add_assign(&mut self, rhs: Self) {
        self.kcal += rhs.kcal;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
    }
}

impl fmt::Display for Macros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0} kcal | P {:.1}g | C {:.1}g | F {:.1}g",
            self.kcal, self.protein, self.carbs, self.fat
        )
    }
}
