//! antbuild-lib: manifest-driven application packaging.
//!
//! An application is a source directory with an `index.xml` manifest. A build
//! reads the manifest, runs its auxiliary tasks, compiles the declared script,
//! style, xsl, content and icon sections, splices them into the manifest, and
//! writes the result either as a directory or as a `<id>.app` container.
//!
//! - `Manifest`: the decoded `index.xml` and its `Head/meta` lookups
//! - `ImportResolver`: recursive `@import` / `require()` inlining
//! - `Toolchain`: bundler, minifier and style compiler collaborators
//! - `build()`: the whole pipeline

pub mod assemble;
pub mod build;
pub mod compile;
pub mod consts;
pub mod directive;
pub mod error;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod resolve;
pub mod rewrite;
pub mod style;
pub mod task;
pub mod toolchain;
pub mod util;

pub use build::{BuildOptions, build};
pub use error::BuildError;
pub use package::BuildResult;
