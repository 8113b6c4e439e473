//! Onboarding: the fixed step sequence, the profile draft it fills, and
//! the pure prompt/advancement lookups that drive it.

pub mod draft;
pub mod flow;
pub mod step;

pub use draft::{Currency, Language, MAX_EXTRA_FIELDS, ProfileDraft};
pub use flow::{advance, advance_message, clarification_prompt, question_for, welcome};
pub use step::Step;
