use serde::{Deserialize, Serialize};
use std::fmt;

fn default_unit() -> String {
    "g".to_string()
}

/// A reference to a food from the food database or a user-authored custom food.
///
/// Nutrient values are expressed per 100 units of `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kcal: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    /// True for foods authored by the user rather than taken from the database.
    #[serde(default)]
    pub custom: bool,
}

impl FoodRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kcal: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            unit: default_unit(),
            custom: false,
        }
    }

    pub fn with_macros(mut self, kcal: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        self.kcal = kcal;
        self.protein = protein;
        self.carbs = carbs;
        self.fat = fat;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    /// A food reference is usable when it can be looked up again later.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty()
    }
}

impl fmt::Display for FoodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.custom {
            write!(f, " (custom)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_defaults_from_minimal_json() {
        let food: FoodRef = serde_json::from_str(r#"{"id":"arroz","name":"Arroz"}"#).unwrap();
        assert_eq!(food.unit, "g");
        assert_eq!(food.kcal, 0.0);
        assert!(!food.custom);
    }

    #[test]
    fn test_food_validity() {
        assert!(FoodRef::new("arroz", "Arroz").is_valid());
        assert!(!FoodRef::new("", "Arroz").is_valid());
        assert!(!FoodRef::new("arroz", "  ").is_valid());
    }

    #[test]
    fn test_food_display_marks_custom() {
        let food = FoodRef::new("bolo", "Bolo da vó").custom();
        assert_eq!(format!("{}", food), "Bolo da vó (custom)");
    }
}
