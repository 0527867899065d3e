//! Declarative cloud resource model and template synthesis for stackforge.
//!
//! This crate contains:
//! - The construct model: `App`, `Stack`, `Environment`, logical ids
//! - The CloudFormation-style template model and intrinsic functions
//! - Container image asset fingerprinting
//! - Typed resource declarations, one module per service family

pub mod app;
pub mod asset;
pub mod codebuild;
pub mod codecommit;
pub mod codepipeline;
pub mod error;
pub mod events;
pub mod iam;
pub mod id;
pub mod lambda;
pub mod logs;
mod naming;
pub mod s3;
pub mod sns;
pub mod stack;
pub mod template;

pub use app::{App, CloudAssembly};
pub use error::{SynthError, SynthResult};
pub use id::LogicalId;
pub use stack::{Environment, Stack};
