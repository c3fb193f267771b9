use crate::{Context, CoreError};
use sculk_store::{migrate_pack, MigrationResult};
use std::path::Path;
use tracing::info;

/// Upgrade the pack at `root` to the current format version.
///
/// Returns `None` when the pack is already current. Migrations that need
/// artifact bytes download them through the context's downloader.
pub fn migrate(ctx: &Context<'_>, root: &Path) -> Result<Option<MigrationResult>, CoreError> {
    let fetcher = ctx.fetcher();
    let result = migrate_pack(root, &fetcher)?;
    if result.is_none() {
        info!("pack at {} is already current", root.display());
    }
    Ok(result)
}
