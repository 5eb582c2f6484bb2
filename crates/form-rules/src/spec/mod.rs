pub mod form;
pub mod property;
pub mod rule;

pub use form::{AutomationAction, DefinitionError, FormDefinition, NotifyChannel, SuccessBehavior};
pub use property::{FieldOption, FormProperty, PropertyType};
pub use rule::{Comparator, FieldValues, FieldVisibility, Predicate, RuleGroup};
