use crate::{
    fetch::Fetcher,
    generator::Generator,
    job::generate_to_file,
    template::{DEFAULT_TEMPLATE, TemplateStore, is_plain_name},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REPORT_FILE: &str = "batch_report.json";

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_owned()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_template")]
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedEntry {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub failed_configs: Vec<FailedEntry>,
}

/**
 * Read a batch list: a JSON array of `{name, url, template}` when the
 * file ends in `.json`, otherwise one subscription url per line.
 */
pub fn load_entries(path: &Path, content: &str) -> anyhow::Result<Vec<BatchEntry>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        return serde_json::from_str(content)
            .with_context(|| format!("parse batch list {}", path.display()));
    }

    /* numbered by line, blank lines keep their number */
    Ok(content
        .trim()
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, url)| BatchEntry {
            name: Some(format!("config_{}", i + 1)),
            url: url.to_owned(),
            template: default_template(),
        })
        .collect())
}

/// Generate every entry into `output/{name}.yaml`, one failure never stops the rest.
pub async fn run_batch<F, S>(
    fetcher: &F,
    generator: &Generator<S>,
    entries: &[BatchEntry],
    output: &Path,
) -> anyhow::Result<BatchReport>
where
    F: Fetcher,
    S: TemplateStore,
{
    tokio::fs::create_dir_all(output).await?;

    let mut report = BatchReport {
        total: entries.len(),
        ..Default::default()
    };

    for (i, entry) in entries.iter().enumerate() {
        let name = entry
            .name
            .clone()
            .unwrap_or_else(|| format!("config_{}", i + 1));
        log::info!("[{}/{}] {}", i + 1, entries.len(), name);

        let outcome = if entry.url.is_empty() {
            Err(anyhow::Error::msg("missing subscription url"))
        } else if !is_plain_name(&name) {
            Err(anyhow::anyhow!("`{}` is not a plain file name", name))
        } else {
            let path = output.join(format!("{}.yaml", name));
            generate_to_file(fetcher, generator, &entry.url, &entry.template, &path).await
        };

        match outcome {
            Ok(_) => report.success += 1,
            Err(err) => {
                log::error!("{}: {:#}", name, err);
                report.failed_configs.push(FailedEntry {
                    name,
                    error: format!("{:#}", err),
                });
            }
        }
    }
    report.failed = report.failed_configs.len();

    let report_path = output.join(REPORT_FILE);
    tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .await
        .with_context(|| format!("write {}", report_path.display()))?;
    log::info!(
        "batch done: {} ok, {} failed, report at {}",
        report.success,
        report.failed,
        report_path.display()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{job::fake::FakeFetcher, template::BuiltinTemplates};

    #[test]
    fn text_list() {
        let entries = load_entries(
            Path::new("subs.txt"),
            "https://a.example.com\n\n  https://b.example.com  \n",
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.as_deref(), Some("config_1"));
        assert_eq!(entries[1].name.as_deref(), Some("config_3"));
        assert_eq!(entries[1].url, "https://b.example.com");
        assert_eq!(entries[1].template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn json_list() {
        let entries = load_entries(
            Path::new("subs.json"),
            r#"[{"name": "home", "url": "https://a.example.com", "template": "basic"}, {"url": "https://b.example.com"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].template, "basic");
        assert_eq!(entries[1].name, None);
        assert_eq!(entries[1].template, DEFAULT_TEMPLATE);

        assert!(load_entries(Path::new("subs.json"), "{").is_err());
    }

    #[tokio::test]
    async fn continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default()
            .with("https://good.example.com", "trojan://pw@a.example.com:443#alpha\n")
            .with("https://bad.example.com", "vmess://%%%\n");
        let generator = Generator::new(BuiltinTemplates);
        let entries = vec![
            BatchEntry {
                name: Some("good".to_owned()),
                url: "https://good.example.com".to_owned(),
                template: "basic".to_owned(),
            },
            BatchEntry {
                name: Some("bad".to_owned()),
                url: "https://bad.example.com".to_owned(),
                template: "basic".to_owned(),
            },
            BatchEntry {
                name: None,
                url: "https://gone.example.com".to_owned(),
                template: DEFAULT_TEMPLATE.to_owned(),
            },
            BatchEntry {
                name: Some("empty".to_owned()),
                url: String::new(),
                template: DEFAULT_TEMPLATE.to_owned(),
            },
        ];

        let report = run_batch(&fetcher, &generator, &entries, dir.path())
            .await
            .unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, 3);
        let failed: Vec<&str> = report
            .failed_configs
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(failed, ["bad", "config_3", "empty"]);

        assert!(dir.path().join("good.yaml").exists());
        assert!(!dir.path().join("bad.yaml").exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(written["total"], 4);
        assert_eq!(written["failed_configs"][2]["error"], "missing subscription url");
    }

    #[tokio::test]
    async fn names_must_stay_inside_output() {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("out");
        let fetcher =
            FakeFetcher::default().with("https://good.example.com", "trojan://pw@a.example.com:443#alpha\n");
        let generator = Generator::new(BuiltinTemplates);
        let entries: Vec<BatchEntry> = ["../escaped", "nested/x", "fine"]
            .into_iter()
            .map(|name| BatchEntry {
                name: Some(name.to_owned()),
                url: "https://good.example.com".to_owned(),
                template: "basic".to_owned(),
            })
            .collect();

        let report = run_batch(&fetcher, &generator, &entries, &output)
            .await
            .unwrap();
        assert_eq!(report.success, 1);
        let failed: Vec<&str> = report
            .failed_configs
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(failed, ["../escaped", "nested/x"]);
        assert!(!root.path().join("escaped.yaml").exists());
        assert!(output.join("fine.yaml").exists());
    }
}
