//! Startup import of a brigade directory.
//!
//! The seed file is a JSON array of brigade entries. Imported brigades are
//! unclaimed. Entries whose name (case-insensitive) already exists are
//! skipped, so importing the same file twice is harmless.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;

use brigade_domain::{Brigade, NewBrigade};

use crate::entity::{BRIGADE_PARTITION, Repository};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub imported: usize,
    pub skipped: usize,
}

pub async fn load_seed_file(path: &Path) -> anyhow::Result<Vec<NewBrigade>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}

pub async fn import_brigades(
    brigades: &Repository<Brigade>,
    entries: Vec<NewBrigade>,
) -> anyhow::Result<SeedReport> {
    let mut known: HashSet<String> = brigades
        .list_partition(BRIGADE_PARTITION)
        .await?
        .into_iter()
        .map(|b| b.name.to_lowercase())
        .collect();

    let mut report = SeedReport::default();
    for entry in entries {
        let key = entry.name.trim().to_lowercase();
        if known.contains(&key) {
            report.skipped += 1;
            continue;
        }
        let brigade = match Brigade::create(entry, None, Utc::now()) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(error = %err, "skipping invalid seed entry");
                report.skipped += 1;
                continue;
            }
        };
        brigades.create(&brigade).await?;
        known.insert(key);
        report.imported += 1;
    }

    tracing::info!(imported = report.imported, skipped = report.skipped, "brigade seed import finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::table_store::InMemoryTableStore;

    fn entry(name: &str) -> NewBrigade {
        NewBrigade {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn imports_unclaimed_and_skips_duplicates() {
        let repo: Repository<Brigade> = Repository::new(Arc::new(InMemoryTableStore::new()));

        let first = import_brigades(&repo, vec![entry("Norte"), entry("Sur"), entry("  ")])
            .await
            .unwrap();
        assert_eq!(first, SeedReport { imported: 2, skipped: 1 });

        let again = import_brigades(&repo, vec![entry("norte"), entry("Este")]).await.unwrap();
        assert_eq!(again, SeedReport { imported: 1, skipped: 1 });

        let all = repo.list_partition(BRIGADE_PARTITION).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|b| !b.is_claimed()));
    }

    #[tokio::test]
    async fn reads_json_array_from_disk() {
        let path = std::env::temp_dir().join(format!("brigade-seed-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"[{"name": "Cordillera", "region": "RM"}]"#)
            .await
            .unwrap();

        let entries = load_seed_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].region.as_deref(), Some("RM"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(load_seed_file(Path::new("/nonexistent/seed.json")).await.is_err());
    }
}
