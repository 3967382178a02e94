use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::meal_category::{default_categories, MealCategory};
use super::meal_entry::{Macros, MealEntry};

/// One of the fixed diet slots a user can switch between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diet {
    pub id: String,
    pub name: String,
    pub meal_categories: Vec<MealCategory>,
    pub meal_entries: Vec<MealEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Diet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            meal_categories: default_categories(),
            meal_entries: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn category(&self, id: &str) -> Option<&MealCategory> {
        self.meal_categories.iter().find(|c| c.id == id)
    }

    pub fn has_category(&self, id: &str) -> bool {
        self.category(id).is_some()
    }

    /// Entries belonging to a category, in insertion order.
    pub fn entries_for<'a>(&'a self, category_id: &'a str) -> impl Iterator<Item = &'a MealEntry> {
        self.meal_entries
            .iter()
            .filter(move |e| e.meal_category_id == category_id)
    }

    pub fn totals(&self) -> Macros {
        let mut totals = Macros::default();
        for entry in &self.meal_entries {
            totals += entry.macros();
        }
        totals
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;

        for category in &self.meal_categories {
            writeln!(f, "\n{}", category)?;
            let mut empty = true;
            for entry in self.entries_for(&category.id) {
                writeln!(f, "  - {} [{}]", entry, entry.id)?;
                empty = false;
            }
            if empty {
                writeln!(f, "  (empty)")?;
            }
        }

        writeln!(f, "\nTotal: {}", self.totals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FoodRef;

    #[test]
    fn test_diet_new_has_default_categories() {
        let diet = Diet::new("diet-1", "Dieta 1", DateTime::default());
        assert_eq!(diet.meal_categories.len(), 4);
        assert!(diet.meal_entries.is_empty());
        assert_eq!(diet.created_at, diet.updated_at);
    }

    #[test]
    fn test_entries_for_filters_by_category() {
        let mut diet = Diet::new("diet-1", "Dieta 1", DateTime::default());
        let food = FoodRef::new("ovo", "Ovo");
        diet.meal_entries
            .push(MealEntry::new(food.clone(), 50.0, "lanche"));
        diet.meal_entries.push(MealEntry::new(food, 50.0, "almoco"));

        assert_eq!(diet.entries_for("lanche").count(), 1);
        assert_eq!(diet.entries_for("jantar").count(), 0);
    }

    #[test]
    fn test_diet_display_lists_categories() {
        let diet = Diet::new("diet-1", "Dieta 1", DateTime::default());
        let output = format!("{}", diet);
        assert!(output.contains("Dieta 1"));
        assert!(output.contains("Almoço"));
        assert!(output.contains("(empty)"));
    }
}
