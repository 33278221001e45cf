//! Source staging: materializing deployment content on local disk, either
//! by extracting an uploaded zip or by cloning a public repository.

pub mod git;
pub mod zip;
