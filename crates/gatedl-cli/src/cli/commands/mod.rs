//! CLI command handlers, one per file.

mod find;
mod login;
mod meta;
mod run;

pub use find::run_find;
pub use login::run_login;
pub use meta::run_meta;
pub use run::{run_recipe, RunOverrides};
