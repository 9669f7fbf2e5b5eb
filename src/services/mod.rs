pub mod detection;
pub mod matching;
pub mod pantry;

pub use detection::{GeminiDetector, ImageUpload, IngredientDetector};
pub use matching::MatchEngine;
pub use pantry::PantryService;
