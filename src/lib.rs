//! Request templates with scoped `{{variables}}`, generated in bulk from a normalized API
//! description and reconciled against the user's saved copies.
//!
//! The core ([`resolver`], [`injector`], [`generator`], [`reconciler`]) is pure and performs no
//! I/O; [`store`], [`export`], [`http_request_executor`] and [`execute`] sit around it.

pub mod errors;
pub mod execute;
pub mod export;
pub mod generator;
pub mod http_request;
pub mod http_request_executor;
pub mod injector;
pub mod operation;
pub mod reconciler;
pub mod resolver;
pub mod scope;
pub mod store;
pub mod workspace;

pub use errors::{MateError, Result};
pub use http_request::{Header, Headers, RequestOrigin, RequestTemplate, TemplateId};
pub use operation::{NormalizedOperation, OperationKey};
pub use resolver::EffectiveMapping;
pub use scope::{ScopeKind, VariableScope};
pub use workspace::{Collection, Workspace};
