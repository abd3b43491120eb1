//! Renders addenda templates: `{{ expr }}` placeholders are resolved against a layered
//! [`VariableContext`], escaped and substituted, and the result is checked to be well-formed XML.

pub mod context;
pub mod error;
pub mod expression;
pub mod format;
pub mod renderer;
pub mod resolver;

pub use context::{display_value, ContextBuilder, VariableContext};
pub use error::{BuildError, ResolveError};
pub use expression::{Aggregate, Expression, FormatSpec};
pub use renderer::{placeholders, TemplateRenderer};
pub use resolver::{ResolveMode, Resolver};
