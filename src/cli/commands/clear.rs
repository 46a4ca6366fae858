//! Clear command - delete the offline cache of the app

use crate::cli::args::ClearArgs;
use crate::cli::Overrides;
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::store::{delete_partitions, DiskStorage, PartitionNames};
use crate::ui::{self, Tone, UiContext};

/// Execute the clear command
///
/// Works without an origin or manifest so a broken setup can still be
/// cleaned up.
pub async fn execute(args: ClearArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let names = PartitionNames::for_app(&config.app.name);
    let cache_dir = overrides.cache_dir(config);

    let target = format!(
        "the offline cache of '{}' in {}",
        config.app.name,
        cache_dir.display()
    );
    if !ui::confirm_delete(&ctx, &target).await? {
        ui::report(&ctx, Tone::Note, "Nothing deleted (pass --yes to skip the prompt)");
        return Ok(());
    }

    let storage = DiskStorage::new(cache_dir);
    let deleted = delete_partitions(&storage, &names).await?;
    if deleted == 0 {
        ui::report(&ctx, Tone::Note, "No cache partitions found");
    } else {
        ui::report_with(&ctx, Tone::Done, "Offline cache deleted", &format!("{} partitions", deleted));
    }

    Ok(())
}
