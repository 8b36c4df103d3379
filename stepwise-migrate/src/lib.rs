//! Stepwise Migration Library
//!
//! [`runner`] is the `up` / `down` / `status` command line applications embed
//! around their compiled-in migrations. [`operator`] backs the
//! `stepwise-migrate` binary, which inspects and repairs schema records.
//! [`scaffold`] writes new migration files for `stepwise-migrate new`.

pub mod operator;
pub mod output;
pub mod runner;
pub mod scaffold;
