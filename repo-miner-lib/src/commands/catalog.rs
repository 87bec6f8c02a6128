use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::progress::Progress;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Fetch the ranked catalog and write the snapshot table, without cloning anything
pub async fn process_catalog<H: Host>(host: &mut H, args: &CatalogArgs) -> Result<()> {
    let common = Common::new(&args.common, |config| {
        if config.output.catalog_snapshot.is_none() {
            config.output.catalog_snapshot = Some("catalog.csv".into());
        }
    })?;

    let progress = common.progress_reporter();
    let descriptors = common.fetch_catalog(&progress).await?;
    progress.done();

    if let Some(path) = &common.config.output.catalog_snapshot {
        if descriptors.is_empty() {
            let _ = writeln!(host.error(), "No repositories were fetched, {path} was not rewritten");
        } else {
            let _ = writeln!(host.output(), "Wrote {} repositories to {path}", descriptors.len());
        }
    }
    Ok(())
}
