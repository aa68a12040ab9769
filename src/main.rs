use anyhow::Context;
use clap::Parser;
use cli_args::{Args, Command};
use config::ConfigDocument;
use fetch::HttpFetcher;
use generator::{Generation, Generator};
use std::path::Path;
use template::{TemplateStore, Templates};
use validator::SchemaValidator;

mod batch;
mod cli_args;
mod config;
mod decoder;
mod fetch;
mod generator;
mod job;
mod normalizer;
mod proxy;
mod rule;
mod subscription;
mod template;
mod translator;
mod validator;
#[cfg(feature = "web")]
mod web;

fn summary(generation: &Generation, output: &Path) -> String {
    let mut line = format!(
        "{} proxies written to {} ({} skipped)",
        generation.document.proxy_names().len(),
        output.display(),
        generation.diagnostics.len()
    );
    for warning in &generation.warnings {
        line.push_str(&format!("\nwarning: {}", warning));
    }
    line
}

fn report(generation: &Generation, output: &Path) {
    for diagnostic in &generation.diagnostics {
        log::warn!("{}", diagnostic);
    }
    println!("{}", summary(generation, output));
}

async fn convert_file(
    generator: &Generator<Templates>,
    file: &Path,
    template: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let body = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let generation = generator.generate(&body, template)?;
    tokio::fs::write(output, generation.to_yaml()?).await?;
    report(&generation, output);
    Ok(())
}

async fn validate_file(file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let document = ConfigDocument::from_yaml(&text)?;
    let report = SchemaValidator.validate(&document)?;
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }
    println!("{} is valid", file.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let generator = Generator::new(Templates::from_dir(args.templates.as_deref()));

    match args.command {
        Command::Generate {
            url,
            template,
            output,
        } => {
            let fetcher = HttpFetcher::new(args.insecure)?;
            let generation =
                job::generate_to_file(&fetcher, &generator, &url, &template, &output).await?;
            report(&generation, &output);
        }
        Command::Convert {
            file,
            template,
            output,
        } => convert_file(&generator, &file, &template, &output).await?,
        Command::Batch { file, output } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let entries = batch::load_entries(&file, &content)?;
            let fetcher = HttpFetcher::new(args.insecure)?;
            let report = batch::run_batch(&fetcher, &generator, &entries, &output).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Validate { file } => validate_file(&file).await?,
        Command::Templates => {
            for name in generator.templates().names() {
                println!("{}", name);
            }
        }
        #[cfg(feature = "web")]
        Command::Serve { listen, output } => {
            let state = web::AppState::new(
                generator,
                HttpFetcher::new(args.insecure)?,
                tasks::MemoryTaskStore::default(),
                output,
            );
            web::serve(listen, state).await?;
        }
    }

    Ok(())
}
