//! Actions: the closed vocabulary, dispatch with human confirmation, and
//! execution of confirmed actions.

pub mod dispatch;
pub mod executor;
pub mod form;
pub mod registry;

pub use dispatch::{DispatchContext, DispatchResult, DispatchStatus, FALLBACK_SUBSCRIPTIONS, months_until};
pub use executor::{ActionExecutor, ExecutionOutcome};
pub use form::{FormField, UiResource};
pub use registry::{Action, ActionDefinition, ActionId, ActionRegistry, FieldSpec, FieldType, FieldValues};
