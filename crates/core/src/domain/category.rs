//! Static category knowledge used when history has nothing to say.

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("dairy", &["milk", "cheese", "yogurt", "butter", "cream"]),
    ("fruits", &["apple", "banana", "orange", "berry", "grape", "lemon", "peach"]),
    ("vegetables", &["tomato", "onion", "carrot", "potato", "lettuce", "spinach", "broccoli"]),
    ("protein", &["chicken", "beef", "fish", "egg", "bean", "tofu"]),
    ("grains", &["bread", "rice", "pasta", "oat", "cereal"]),
    ("beverages", &["juice", "soda", "tea", "coffee", "water"]),
    ("condiments", &["sauce", "dressing", "spice", "salt", "pepper", "oil"]),
    ("snacks", &["chip", "cookie", "cracker", "nut"]),
];

const SHELF_LIFE_DAYS: &[(&str, u32)] = &[
    ("dairy", 7),
    ("meat", 3),
    ("fish", 2),
    ("fruits", 5),
    ("vegetables", 7),
    ("bread", 5),
    ("eggs", 14),
    ("leftovers", 3),
    ("canned", 365),
    ("frozen", 90),
    ("dry_goods", 180),
];

pub const FALLBACK_CATEGORY: &str = "other";
pub const FALLBACK_SHELF_LIFE_DAYS: u32 = 7;

/// Keyword-based category for an item name that history has never seen.
pub fn guess_category(item_name: &str) -> &'static str {
    let name = item_name.to_lowercase();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| name.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

pub fn default_shelf_life_days(category: &str) -> u32 {
    SHELF_LIFE_DAYS
        .iter()
        .find(|(known, _)| *known == category)
        .map(|(_, days)| *days)
        .unwrap_or(FALLBACK_SHELF_LIFE_DAYS)
}
