//! Versioned migrations: catalog, planning and execution.
//!
//! - [`MigrationCatalog`]: validated, version-indexed descriptors for one key
//! - [`build_plan`]: which versions to apply or revert to reach a target
//! - [`Migrator`]: runs a plan step by step against a provider
//! - [`load_directory`]: descriptors from `<version>_<name>.up.sql` scripts

mod catalog;
mod executor;
mod plan;
mod sql_file;

pub use catalog::{BoundMigration, MigrationCatalog, MigrationDescriptor};
pub use executor::{Direction, ListEntry, MigrationReport, MigrationStep, Migrator};
pub use plan::{build_plan, MigrationPlan};
pub use sql_file::{load_directory, SqlScriptMigration};

/// Turn a type or file name into a sentence: `CreateUsersTable` becomes
/// "Create users table", `add_email_2_users` becomes "Add email 2 users".
pub fn to_human_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 8);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            spaced.push(' ');
        }
        spaced.push(if c == '_' { ' ' } else { c });
        prev = Some(c);
    }

    let lower = spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
