pub mod context;
pub mod error;
pub mod policy;
pub mod test_macros;

pub use context::{OperatorContext, OperatorCtxExtractor};
pub use error::SecurityError;
pub use policy::{
    ensure_active, ensure_branch, ensure_can_grant, ensure_permission, ensure_province, GuardKind,
};
