// Entity Models
//
// Each entity has:
// - Store-assigned integer identity that never changes
// - Plain value fields mirrored 1:1 from its table
// - Foreign keys instead of object links (appearances point at both parents)

pub mod appearance;
pub mod episode;
pub mod guest;

pub use appearance::{Appearance, Rating, RatingError};
pub use episode::Episode;
pub use guest::Guest;
