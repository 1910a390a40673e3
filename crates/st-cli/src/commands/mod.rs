//! CLI command implementations

pub(crate) mod common;
pub(crate) mod plan;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod up;
pub(crate) mod validate;
