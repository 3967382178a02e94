use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of meal categories a single diet may hold.
pub const MAX_MEAL_CATEGORIES: usize = 10;

/// A user-configurable grouping of meal entries (breakfast, lunch, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCategory {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color_tag: String,
    #[serde(default)]
    pub order: u32,
}

impl MealCategory {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        icon: impl Into<String>,
        color_tag: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon: icon.into(),
            color_tag: color_tag.into(),
            order,
        }
    }

    /// Creates a user-defined category with a generated id.
    pub fn custom(
        display_name: impl Into<String>,
        icon: impl Into<String>,
        color_tag: impl Into<String>,
    ) -> Self {
        Self::new(
            format!("custom-{}", Uuid::new_v4()),
            display_name,
            icon,
            color_tag,
            0,
        )
    }

    fn apply(&mut self, patch: &MealCategoryPatch) {
        if let Some(name) = patch.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                self.display_name = name.to_string();
            }
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(color) = &patch.color_tag {
            self.color_tag = color.clone();
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.icon.is_empty() {
            write!(f, "{}", self.display_name)
        } else {
            write!(f, "{} {}", self.icon, self.display_name)
        }
    }
}

/// Partial update for a meal category. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealCategoryPatch {
    pub display_name: Option<String>,
    pub icon: Option<String>,
    pub color_tag: Option<String>,
}

impl MealCategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.icon.is_none() && self.color_tag.is_none()
    }
}

/// The category set every diet starts with.
pub fn default_categories() -> Vec<MealCategory> {
    vec![
        MealCategory::new("cafe-da-manha", "Café da manhã", "☕", "amber", 0),
        MealCategory::new("almoco", "Almoço", "🍽", "green", 1),
        MealCategory::new("lanche", "Lanche", "🍎", "orange", 2),
        MealCategory::new("jantar", "Jantar", "🌙", "indigo", 3),
    ]
}

/// Sorts categories by `order` (stable, so ties keep their current position)
/// and rewrites the orders as a dense `0..n` sequence.
pub(crate) fn normalize_order(categories: &mut [MealCategory]) {
    categories.sort_by_key(|c| c.order);
    for (index, category) in categories.iter_mut().enumerate() {
        category.order = index as u32;
    }
}

/// Applies a patch to the category with the given id. Returns false if absent.
pub(crate) fn patch_category(
    categories: &mut [MealCategory],
    id: &str,
    patch: &MealCategoryPatch,
) -> bool {
    match categories.iter_mut().find(|c| c.id == id) {
        Some(category) => {
            category.apply(patch);
            true
        }
        None => false,
    }
}

/// Reorders categories to follow `ids`. Ids that are unknown are skipped;
/// categories missing from `ids` keep their relative order after the listed ones.
pub(crate) fn reorder(categories: &mut Vec<MealCategory>, ids: &[String]) {
    let mut remaining = std::mem::take(categories);
    let mut ordered = Vec::with_capacity(remaining.len());

    for id in ids {
        if let Some(pos) = remaining.iter().position(|c| &c.id == id) {
            ordered.push(remaining.remove(pos));
        }
    }
    ordered.extend(remaining);

    for (index, category) in ordered.iter_mut().enumerate() {
        category.order = index as u32;
    }
    *categories = ordered;
}
