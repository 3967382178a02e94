//! The root aggregate persisted as one document, locally and remotely.
//!
//! Every mutation is a total function `&DietState -> DietState`. Requests that
//! cannot apply (unknown ids, invalid food, category cap reached) return an
//! unchanged copy instead of failing, so callers can detect a no-op with `==`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

use super::diet::Diet;
use super::food::FoodRef;
use super::meal_category::{
    default_categories, normalize_order, patch_category, reorder, MealCategory, MealCategoryPatch,
    MAX_MEAL_CATEGORIES,
};
use super::meal_entry::{is_valid_quantity, MealEntry};

/// Number of diet slots. Diets are never created or destroyed by the user.
pub const DIET_SLOTS: usize = 4;

pub const DEFAULT_HYDRATION_GOAL_ML: f64 = 2000.0;

fn slot_id(index: usize) -> String {
    format!("diet-{}", index + 1)
}

fn slot_name(index: usize) -> String {
    format!("Dieta {}", index + 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct DietState {
    diets: Vec<Diet>,
    pub active_diet_id: String,
    pub favorites: BTreeSet<String>,
    pub hydration_goal: f64,
}

impl Default for DietState {
    fn default() -> Self {
        let diets: Vec<Diet> = (0..DIET_SLOTS)
            .map(|i| Diet::new(slot_id(i), slot_name(i), DateTime::default()))
            .collect();
        let active_diet_id = slot_id(0);
        Self {
            diets,
            active_diet_id,
            favorites: BTreeSet::new(),
            hydration_goal: DEFAULT_HYDRATION_GOAL_ML,
        }
    }
}

impl DietState {
    /// The diet slots, always exactly four.
    pub fn diets(&self) -> &[Diet] {
        &self.diets
    }

    /// Falls back to the first slot when `active_diet_id` does not resolve.
    pub fn active_diet(&self) -> &Diet {
        self.diet(&self.active_diet_id)
            .unwrap_or(&self.diets[0])
    }

    pub fn diet(&self, id: &str) -> Option<&Diet> {
        self.diets.iter().find(|d| d.id == id)
    }

    pub fn is_favorite(&self, food_id: &str) -> bool {
        self.favorites.contains(food_id)
    }

    /// Clones the state and runs `f` against the named diet.
    fn with_diet(&self, diet_id: &str, f: impl FnOnce(&mut Diet)) -> Self {
        let mut next = self.clone();
        if let Some(diet) = next.diets.iter_mut().find(|d| d.id == diet_id) {
            f(diet);
        }
        next
    }

    fn with_active_diet(&self, f: impl FnOnce(&mut Diet)) -> Self {
        let id = self.active_diet().id.clone();
        self.with_diet(&id, f)
    }

    // ------------------------------------------------------------------
    // Diet slots
    // ------------------------------------------------------------------

    /// Makes `diet_id` the active diet. Unknown ids keep the current one.
    pub fn switch_diet(&self, diet_id: &str) -> Self {
        let mut next = self.clone();
        if self.diet(diet_id).is_some() {
            next.active_diet_id = diet_id.to_string();
        }
        next
    }

    pub fn rename_diet(&self, diet_id: &str, name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            return self.clone();
        }
        self.with_diet(diet_id, |diet| diet.name = name.to_string())
    }

    pub fn clear_diet(&self, diet_id: &str) -> Self {
        self.with_diet(diet_id, |diet| diet.meal_entries.clear())
    }

    /// Copies categories and entries of `source_id` into `target_id`.
    ///
    /// Copied entries get fresh ids so entry identity stays unique across diets.
    pub fn clone_diet(&self, source_id: &str, target_id: &str) -> Self {
        if source_id == target_id || self.diet(target_id).is_none() {
            return self.clone();
        }
        let Some(source) = self.diet(source_id) else {
            return self.clone();
        };
        let categories = source.meal_categories.clone();
        let entries: Vec<MealEntry> = source
            .meal_entries
            .iter()
            .map(MealEntry::with_fresh_id)
            .collect();

        self.with_diet(target_id, move |target| {
            target.meal_categories = categories;
            target.meal_entries = entries;
        })
    }

    // ------------------------------------------------------------------
    // Meal entries (active diet)
    // ------------------------------------------------------------------

    pub fn add_meal_item(&self, food: FoodRef, quantity: f64, meal_category_id: &str) -> Self {
        self.add_meal_entry(MealEntry::new(food, quantity, meal_category_id))
    }

    /// Adds a prepared entry. An id that collides with an existing entry is
    /// replaced with a fresh one.
    pub fn add_meal_entry(&self, entry: MealEntry) -> Self {
        if !entry.food.is_valid() || !is_valid_quantity(entry.quantity) {
            return self.clone();
        }
        self.with_active_diet(|diet| {
            if !diet.has_category(&entry.meal_category_id) {
                return;
            }
            let entry = if entry.id.is_empty() || diet.meal_entries.iter().any(|e| e.id == entry.id)
            {
                entry.with_fresh_id()
            } else {
                entry
            };
            diet.meal_entries.push(entry);
        })
    }

    pub fn remove_meal_item(&self, entry_id: &str) -> Self {
        self.with_active_diet(|diet| diet.meal_entries.retain(|e| e.id != entry_id))
    }

    pub fn update_meal_item_quantity(&self, entry_id: &str, quantity: f64) -> Self {
        if !is_valid_quantity(quantity) {
            return self.clone();
        }
        self.with_active_diet(|diet| {
            if let Some(entry) = diet.meal_entries.iter_mut().find(|e| e.id == entry_id) {
                entry.quantity = quantity;
            }
        })
    }

    /// Removes every entry of the active diet.
    pub fn clear_meals(&self) -> Self {
        let id = self.active_diet().id.clone();
        self.clear_diet(&id)
    }

    // ------------------------------------------------------------------
    // Meal categories (active diet)
    // ------------------------------------------------------------------

    pub fn add_meal_type(&self, display_name: &str, icon: &str, color_tag: &str) -> Self {
        let name = display_name.trim();
        if name.is_empty() {
            return self.clone();
        }
        self.add_meal_category(MealCategory::custom(name, icon, color_tag))
    }

    /// Appends a category at the end of the display order. No-op when the
    /// diet already holds the maximum or the id is taken.
    pub fn add_meal_category(&self, mut category: MealCategory) -> Self {
        self.with_active_diet(|diet| {
            if diet.meal_categories.len() >= MAX_MEAL_CATEGORIES || diet.has_category(&category.id)
            {
                return;
            }
            category.order = diet
                .meal_categories
                .iter()
                .map(|c| c.order + 1)
                .max()
                .unwrap_or(0);
            diet.meal_categories.push(category);
            normalize_order(&mut diet.meal_categories);
        })
    }

    pub fn update_meal_type(&self, category_id: &str, patch: &MealCategoryPatch) -> Self {
        if patch.is_empty() {
            return self.clone();
        }
        self.with_active_diet(|diet| {
            patch_category(&mut diet.meal_categories, category_id, patch);
        })
    }

    /// Removes a category and every entry assigned to it.
    pub fn remove_meal_type(&self, category_id: &str) -> Self {
        self.with_active_diet(|diet| {
            if !diet.has_category(category_id) {
                return;
            }
            diet.meal_categories.retain(|c| c.id != category_id);
            diet.meal_entries
                .retain(|e| e.meal_category_id != category_id);
            normalize_order(&mut diet.meal_categories);
        })
    }

    pub fn reorder_meal_types(&self, ordered_ids: &[String]) -> Self {
        self.with_active_diet(|diet| reorder(&mut diet.meal_categories, ordered_ids))
    }

    // ------------------------------------------------------------------
    // Root-level fields
    // ------------------------------------------------------------------

    pub fn toggle_favorite(&self, food_id: &str) -> Self {
        let mut next = self.clone();
        let food_id = food_id.trim();
        if food_id.is_empty() {
            return next;
        }
        if !next.favorites.remove(food_id) {
            next.favorites.insert(food_id.to_string());
        }
        next
    }

    /// Sets the daily hydration goal in ml. Negative or non-finite values are ignored.
    pub fn set_hydration_goal(&self, goal_ml: f64) -> Self {
        let mut next = self.clone();
        if goal_ml.is_finite() && goal_ml >= 0.0 {
            next.hydration_goal = goal_ml;
        }
        next
    }

    /// Stamps `at` on every diet whose contents differ from `previous`.
    pub fn touch_changed(mut self, previous: &DietState, at: DateTime<Utc>) -> Self {
        for diet in &mut self.diets {
            if previous.diet(&diet.id) != Some(&*diet) {
                diet.touch(at);
            }
        }
        self
    }

    // ------------------------------------------------------------------
    // Lenient loading
    // ------------------------------------------------------------------

    /// Builds a state from an untrusted JSON document, repairing what it can.
    ///
    /// Unparseable entries and entries without a valid food are dropped, the
    /// diet collection is forced to exactly [`DIET_SLOTS`] members, empty
    /// category sets are replaced by the defaults, and an unresolvable active
    /// diet falls back to the first slot.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(root) = value else {
            return Self::default();
        };

        let mut seen = HashSet::new();
        let mut diets: Vec<Diet> = root
            .get("diets")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| parse_diet(item, i))
                    .filter(|d| seen.insert(d.id.clone()))
                    .take(DIET_SLOTS)
                    .collect()
            })
            .unwrap_or_default();

        let mut slot = 0;
        while diets.len() < DIET_SLOTS {
            let id = slot_id(slot);
            if !diets.iter().any(|d| d.id == id) {
                diets.push(Diet::new(id, slot_name(slot), DateTime::default()));
            }
            slot += 1;
        }

        let active_diet_id = root
            .get("activeDietId")
            .and_then(Value::as_str)
            .filter(|id| diets.iter().any(|d| d.id == *id))
            .map(str::to_string)
            .unwrap_or_else(|| diets[0].id.clone());

        let favorites = root
            .get("favorites")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let hydration_goal = root
            .get("hydrationGoal")
            .and_then(Value::as_f64)
            .filter(|g| g.is_finite() && *g >= 0.0)
            .unwrap_or(DEFAULT_HYDRATION_GOAL_ML);

        Self {
            diets,
            active_diet_id,
            favorites,
            hydration_goal,
        }
    }
}

impl From<Value> for DietState {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn parse_diet(value: &Value, index: usize) -> Option<Diet> {
    let obj = value.as_object()?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?
        .to_string();
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slot_name(index));

    let mut category_ids = HashSet::new();
    let mut meal_categories: Vec<MealCategory> = obj
        .get("mealCategories")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| serde_json::from_value::<MealCategory>(c.clone()).ok())
                .filter(|c| !c.id.is_empty() && category_ids.insert(c.id.clone()))
                .collect()
        })
        .unwrap_or_default();
    normalize_order(&mut meal_categories);
    meal_categories.truncate(MAX_MEAL_CATEGORIES);
    if meal_categories.is_empty() {
        meal_categories = default_categories();
    }

    let mut entry_ids = HashSet::new();
    let meal_entries = obj
        .get("mealEntries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|e| serde_json::from_value::<MealEntry>(e.clone()).ok())
                .filter(|e| e.is_valid())
                .filter(|e| meal_categories.iter().any(|c| c.id == e.meal_category_id))
                .map(|e| {
                    if entry_ids.insert(e.id.clone()) {
                        e
                    } else {
                        e.with_fresh_id()
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let created_at = parse_timestamp(obj.get("createdAt")).unwrap_or_default();
    let updated_at = parse_timestamp(obj.get("updatedAt")).unwrap_or(created_at);

    Some(Diet {
        id,
        name,
        meal_categories,
        meal_entries,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn food(id: &str) -> FoodRef {
        FoodRef::new(id, id.to_uppercase()).with_macros(100.0, 10.0, 10.0, 1.0)
    }

    fn entry_ids(diet: &Diet) -> HashSet<String> {
        diet.meal_entries.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_default_state_has_four_diets() {
        let state = DietState::default();
        assert_eq!(state.diets.len(), DIET_SLOTS);
        assert_eq!(state.active_diet_id, "diet-1");
        assert_eq!(state.hydration_goal, DEFAULT_HYDRATION_GOAL_ML);
    }

    #[test]
    fn test_switch_diet_ignores_unknown_id() {
        let state = DietState::default();
        assert_eq!(state.switch_diet("diet-3").active_diet_id, "diet-3");
        assert_eq!(state.switch_diet("diet-9"), state);
    }

    #[test]
    fn test_rename_any_diet() {
        let state = DietState::default();
        let next = state.rename_diet("diet-2", "  Cutting  ");
        assert_eq!(next.diet("diet-2").unwrap().name, "Cutting");
        assert_eq!(next.active_diet_id, "diet-1");
        assert_eq!(state.rename_diet("diet-2", "   "), state);
    }

    #[test]
    fn test_touch_changed_stamps_only_edited_diets() {
        let state = DietState::default();
        let at = DateTime::from_timestamp_millis(5_000).unwrap();
        let next = state.rename_diet("diet-2", "Cutting").touch_changed(&state, at);

        assert_eq!(next.diet("diet-2").unwrap().updated_at, at);
        assert_eq!(next.diet("diet-2").unwrap().created_at, DateTime::<Utc>::default());
        assert_eq!(next.diet("diet-1"), state.diet("diet-1"));
    }

    #[test]
    fn test_default_states_compare_equal() {
        assert_eq!(DietState::default(), DietState::default());
        assert_eq!(DietState::from_value(json!({})), DietState::default());
    }

    #[test]
    fn test_active_diet_falls_back_to_first_slot() {
        let mut state = DietState::default();
        state.active_diet_id = "gone".to_string();
        assert_eq!(state.active_diet().id, "diet-1");
        assert_eq!(state.diets().len(), DIET_SLOTS);
    }

    #[test]
    fn test_clear_diet_keeps_cardinality() {
        let state = DietState::default()
            .add_meal_item(food("ovo"), 50.0, "lanche")
            .add_meal_item(food("pao"), 50.0, "lanche");
        let cleared = state.clear_diet("diet-1");
        assert!(cleared.active_diet().meal_entries.is_empty());
        assert_eq!(cleared.diets.len(), DIET_SLOTS);
    }

    #[test]
    fn test_clone_diet_isolates_entry_ids() {
        let state = DietState::default()
            .add_meal_item(food("ovo"), 50.0, "lanche")
            .add_meal_item(food("arroz"), 150.0, "almoco");
        let cloned = state.clone_diet("diet-1", "diet-2");

        let source = cloned.diet("diet-1").unwrap();
        let target = cloned.diet("diet-2").unwrap();
        assert_eq!(target.meal_entries.len(), 2);
        assert!(entry_ids(source).is_disjoint(&entry_ids(target)));
        assert_eq!(source, state.diet("diet-1").unwrap());
        assert_eq!(cloned.diets.len(), DIET_SLOTS);

        // Mutating the clone leaves the source alone
        let target_entry = target.meal_entries[0].id.clone();
        let after = cloned.switch_diet("diet-2").remove_meal_item(&target_entry);
        assert_eq!(after.diet("diet-1").unwrap().meal_entries.len(), 2);
        assert_eq!(after.diet("diet-2").unwrap().meal_entries.len(), 1);
    }

    #[test]
    fn test_clone_diet_unknown_source_is_noop() {
        let state = DietState::default();
        assert_eq!(state.clone_diet("nope", "diet-2"), state);
        assert_eq!(state.clone_diet("diet-1", "diet-1"), state);
    }

    #[test]
    fn test_add_meal_item_validates_input() {
        let state = DietState::default();
        assert_eq!(state.add_meal_item(food("ovo"), 50.0, "unknown"), state);
        assert_eq!(state.add_meal_item(food("ovo"), -1.0, "lanche"), state);
        assert_eq!(state.add_meal_item(FoodRef::new("", "x"), 1.0, "lanche"), state);
        let next = state.add_meal_item(food("ovo"), 50.0, "lanche");
        assert_eq!(next.active_diet().meal_entries.len(), 1);
    }

    #[test]
    fn test_add_meal_entry_replaces_colliding_id() {
        let entry = MealEntry::new(food("ovo"), 50.0, "lanche");
        let state = DietState::default()
            .add_meal_entry(entry.clone())
            .add_meal_entry(entry.clone());
        let ids = entry_ids(state.active_diet());
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&entry.id));
    }

    #[test]
    fn test_update_quantity() {
        let state = DietState::default().add_meal_item(food("ovo"), 50.0, "lanche");
        let id = state.active_diet().meal_entries[0].id.clone();
        let next = state.update_meal_item_quantity(&id, 120.0);
        assert_eq!(next.active_diet().meal_entries[0].quantity, 120.0);
        assert_eq!(next.update_meal_item_quantity(&id, 0.0), next);
    }

    #[test]
    fn test_remove_meal_type_cascades() {
        let state = DietState::default()
            .add_meal_item(food("banana"), 100.0, "lanche")
            .add_meal_item(food("iogurte"), 170.0, "lanche")
            .add_meal_item(food("arroz"), 150.0, "almoco");

        let next = state.remove_meal_type("lanche");
        let diet = next.active_diet();
        assert_eq!(diet.meal_entries.len(), 1);
        assert_eq!(diet.meal_entries[0].meal_category_id, "almoco");
        assert!(!diet.has_category("lanche"));
        let orders: Vec<u32> = diet.meal_categories.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_add_meal_type_respects_cap() {
        let mut state = DietState::default();
        for i in 0..20 {
            state = state.add_meal_type(&format!("Extra {}", i), "", "");
        }
        assert_eq!(state.active_diet().meal_categories.len(), MAX_MEAL_CATEGORIES);
        let last = state.active_diet().meal_categories.last().unwrap();
        assert_eq!(last.order as usize, MAX_MEAL_CATEGORIES - 1);
        // Other diets are untouched
        assert_eq!(state.diet("diet-2").unwrap().meal_categories.len(), 4);
    }

    #[test]
    fn test_update_meal_type() {
        let state = DietState::default();
        let patch = MealCategoryPatch {
            display_name: Some("Merenda".to_string()),
            ..Default::default()
        };
        let next = state.update_meal_type("lanche", &patch);
        assert_eq!(
            next.active_diet().category("lanche").unwrap().display_name,
            "Merenda"
        );
        assert_eq!(state.update_meal_type("missing", &patch), state);
    }

    #[test]
    fn test_reorder_meal_types() {
        let state = DietState::default();
        let ids = vec!["jantar".to_string(), "cafe-da-manha".to_string()];
        let next = state.reorder_meal_types(&ids);
        let order: Vec<&str> = next
            .active_diet()
            .meal_categories
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(order, vec!["jantar", "cafe-da-manha", "almoco", "lanche"]);

        let same = vec!["cafe-da-manha".to_string()];
        assert_eq!(state.reorder_meal_types(&same), state);
    }

    #[test]
    fn test_toggle_favorite_and_hydration() {
        let state = DietState::default().toggle_favorite("ovo");
        assert!(state.is_favorite("ovo"));
        assert!(!state.toggle_favorite("ovo").is_favorite("ovo"));

        assert_eq!(state.set_hydration_goal(2500.0).hydration_goal, 2500.0);
        assert_eq!(state.set_hydration_goal(-5.0), state);
        assert_eq!(state.set_hydration_goal(f64::INFINITY), state);
    }

    #[test]
    fn test_cardinality_survives_every_operation() {
        const DIET_IDS: [&str; 5] = ["diet-1", "diet-2", "diet-3", "diet-4", "diet-9"];
        const CATEGORY_IDS: [&str; 5] = ["cafe-da-manha", "almoco", "lanche", "jantar", "nope"];

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = DietState::default();

            for _ in 0..60 {
                let diet_id = DIET_IDS[rng.random_range(0..DIET_IDS.len())];
                let other_id = DIET_IDS[rng.random_range(0..DIET_IDS.len())];
                let category_id = CATEGORY_IDS[rng.random_range(0..CATEGORY_IDS.len())];
                let entry_id = state
                    .active_diet()
                    .meal_entries
                    .first()
                    .map(|e| e.id.clone())
                    .unwrap_or_default();

                state = match rng.random_range(0..14) {
                    0 => state.switch_diet(diet_id),
                    1 => state.rename_diet(diet_id, "Renamed"),
                    2 => state.clear_diet(diet_id),
                    3 => state.clone_diet(diet_id, other_id),
                    4 => {
                        let quantity = rng.random_range(-10.0..500.0);
                        state.add_meal_item(food("ovo"), quantity, category_id)
                    }
                    5 => state.remove_meal_item(&entry_id),
                    6 => {
                        let quantity = rng.random_range(-10.0..500.0);
                        state.update_meal_item_quantity(&entry_id, quantity)
                    }
                    7 => state.clear_meals(),
                    8 => state.add_meal_type("Ceia", "🌙", "blue"),
                    9 => state.update_meal_type(
                        category_id,
                        &MealCategoryPatch {
                            display_name: Some("Patched".to_string()),
                            ..Default::default()
                        },
                    ),
                    10 => state.remove_meal_type(category_id),
                    11 => {
                        let mut ids: Vec<String> = state
                            .active_diet()
                            .meal_categories
                            .iter()
                            .map(|c| c.id.clone())
                            .collect();
                        ids.reverse();
                        state.reorder_meal_types(&ids)
                    }
                    12 => state.toggle_favorite("ovo"),
                    _ => state.set_hydration_goal(rng.random_range(-100.0..4000.0)),
                };

                assert_eq!(state.diets.len(), DIET_SLOTS, "seed {}", seed);
                let diet_ids: HashSet<&str> = state.diets.iter().map(|d| d.id.as_str()).collect();
                assert_eq!(diet_ids.len(), DIET_SLOTS, "seed {}", seed);
                assert!(state.diet(&state.active_diet_id).is_some(), "seed {}", seed);
                assert!(state.hydration_goal >= 0.0);

                let mut entry_ids = HashSet::new();
                for diet in &state.diets {
                    assert!(diet.meal_categories.len() <= MAX_MEAL_CATEGORIES);
                    for entry in &diet.meal_entries {
                        assert!(diet.has_category(&entry.meal_category_id), "seed {}", seed);
                        assert!(entry.quantity > 0.0);
                        assert!(entry_ids.insert(entry.id.clone()), "seed {}", seed);
                    }
                }
            }
        }
    }

    #[test]
    fn test_json_roundtrip_is_structurally_equal() {
        let state = DietState::default()
            .add_meal_item(food("ovo"), 50.0, "lanche")
            .toggle_favorite("ovo");
        let json = serde_json::to_string(&state).unwrap();
        let parsed: DietState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_from_value_fills_missing_diets() {
        let doc = json!({
            "diets": [
                { "id": "diet-2", "name": "Only one", "mealCategories": [], "mealEntries": [] }
            ],
            "activeDietId": "diet-2",
            "favorites": ["ovo", 3],
            "hydrationGoal": 1800
        });
        let state = DietState::from_value(doc);
        assert_eq!(state.diets.len(), DIET_SLOTS);
        assert_eq!(state.diets[0].id, "diet-2");
        assert_eq!(state.diets[0].meal_categories, default_categories());
        let ids: HashSet<&str> = state.diets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), DIET_SLOTS);
        assert_eq!(state.active_diet_id, "diet-2");
        assert_eq!(state.favorites.len(), 1);
        assert_eq!(state.hydration_goal, 1800.0);
    }

    #[test]
    fn test_from_value_drops_malformed_entries() {
        let doc = json!({
            "diets": [{
                "id": "diet-1",
                "name": "Dieta 1",
                "mealCategories": [{ "id": "lanche", "displayName": "Lanche", "order": 0 }],
                "mealEntries": [
                    { "id": "a", "food": { "id": "ovo", "name": "Ovo" }, "quantity": 50, "mealCategoryId": "lanche" },
                    { "id": "b", "quantity": 50, "mealCategoryId": "lanche" },
                    { "id": "c", "food": { "id": "", "name": "?" }, "quantity": 50, "mealCategoryId": "lanche" },
                    { "id": "d", "food": { "id": "pao", "name": "Pão" }, "quantity": 50, "mealCategoryId": "gone" }
                ]
            }],
            "activeDietId": "diet-7"
        });
        let state = DietState::from_value(doc);
        let diet = state.diet("diet-1").unwrap();
        assert_eq!(diet.meal_entries.len(), 1);
        assert_eq!(diet.meal_entries[0].id, "a");
        assert_eq!(state.active_diet_id, "diet-1");
    }

    #[test]
    fn test_from_value_truncates_extra_diets() {
        let diets: Vec<Value> = (1..=6)
            .map(|i| json!({ "id": format!("d{}", i), "name": format!("D{}", i) }))
            .collect();
        let state = DietState::from_value(json!({ "diets": diets }));
        assert_eq!(state.diets.len(), DIET_SLOTS);
        assert_eq!(state.diets[3].id, "d4");
    }

    #[test]
    fn test_from_value_non_object_yields_default_shape() {
        let state = DietState::from_value(json!([1, 2, 3]));
        assert_eq!(state.diets.len(), DIET_SLOTS);
        assert_eq!(state.active_diet_id, "diet-1");
    }
}
