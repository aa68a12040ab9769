use crate::{
    fetch::Fetcher,
    generator::{Generation, Generator},
    template::TemplateStore,
};
use anyhow::Context;
use std::path::Path;

/**
 * Fetch one subscription, generate its document and write it to `output`.
 * Nothing is written when generation fails.
 */
pub async fn generate_to_file<F, S>(
    fetcher: &F,
    generator: &Generator<S>,
    url: &str,
    template: &str,
    output: &Path,
) -> anyhow::Result<Generation>
where
    F: Fetcher,
    S: TemplateStore,
{
    let body = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("fetch {}", url))?;
    let generation = generator.generate(&body, template)?;
    let yaml = generation.to_yaml()?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, yaml)
        .await
        .with_context(|| format!("write {}", output.display()))?;
    log::info!(
        "{} proxies written to {}",
        generation.document.proxy_names().len(),
        output.display()
    );

    Ok(generation)
}
