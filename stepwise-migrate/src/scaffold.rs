//! Migration file scaffolding for `stepwise-migrate new`
//!
//! Each migration lives in `<path>/<YYYYMMDDHHMM>_<name>.rs` and exposes
//! `pub fn migration() -> Migration`. The directory's `mod.rs` is the
//! `pkg_name` module: it is regenerated after every new file and lists all
//! migrations in version order, so applications only need
//! `mod <pkg_name>;` and `<pkg_name>::migrations()`.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use stepwise::config::StepwiseConfig;

/// Version format of generated migrations
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M";

/// Write a new migration named `name`, versioned from `now`, and refresh
/// the module index
///
/// Returns the path of the new migration file.
///
/// # Errors
///
/// Fails if `name` is not a lowercase identifier, if a migration with the
/// same version and name exists, or if the directory cannot be written.
pub fn new_migration(
    config: &StepwiseConfig,
    name: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<PathBuf> {
    validate_name(name)?;
    let dir = config.migration_path();
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create migration directory {}", dir.display()))?;

    let version = now.format(VERSION_FORMAT).to_string();
    let file = dir.join(format!("{version}_{name}.rs"));
    if file.exists() {
        bail!("migration {} already exists", file.display());
    }

    fs::write(&file, migration_template(&version, name, now))
        .with_context(|| format!("failed to write {}", file.display()))?;
    log::info!("Generated migration {}", file.display());

    write_index(dir, &config.pkg_name)?;
    Ok(file)
}

fn validate_name(name: &str) -> anyhow::Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        bail!("invalid migration name {name:?}: use lowercase letters, digits and '_', starting with a letter");
    }
    Ok(())
}

fn migration_template(version: &str, name: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"//! Migration {version}: {name}
//! Generated: {generated}

use stepwise::{{Migration, MigrationContext}};

pub fn migration() -> Migration {{
    Migration::new(
        "{version}",
        |_ctx: &MigrationContext| {{
            // Forward changes go here
            Ok(())
        }},
        |_ctx: &MigrationContext| {{
            // Undo the forward changes here
            Ok(())
        }},
    )
}}
"#,
        generated = now.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Migration file stems in `dir`, in version order
fn migration_stems(dir: &Path) -> anyhow::Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut stems = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if is_migration_stem(stem) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

fn is_migration_stem(stem: &str) -> bool {
    stem.split_once('_').is_some_and(|(version, name)| {
        version.len() == 12 && version.bytes().all(|b| b.is_ascii_digit()) && !name.is_empty()
    })
}

/// Regenerate `<dir>/mod.rs` as the `pkg_name` module
fn write_index(dir: &Path, pkg_name: &str) -> anyhow::Result<()> {
    let stems = migration_stems(dir)?;
    let mut index = format!(
        "//! `{pkg_name}` migrations\n//!\n//! Regenerated by `stepwise-migrate new`; edits are overwritten.\n\nuse stepwise::Migration;\n\n"
    );
    for stem in &stems {
        index.push_str(&format!("#[path = \"{stem}.rs\"]\nmod m{stem};\n"));
    }
    index.push_str("\n/// Every migration in version order\npub fn migrations() -> Vec<Migration> {\n    vec![\n");
    for stem in &stems {
        index.push_str(&format!("        m{stem}::migration(),\n"));
    }
    index.push_str("    ]\n}\n");

    let path = dir.join("mod.rs");
    fs::write(&path, index).with_context(|| format!("failed to write {}", path.display()))?;
    log::debug!("Indexed {} migrations in {}", stems.len(), path.display());
    Ok(())
}
