//! Per-resource score statistics.
//!
//! Statistics live under `statistics/` inside the score resource:
//! a min/max file and a histogram file per score, plus a stats hash
//! recording the inputs they were computed from. Computation is split
//! per chromosome so a task graph can parallelize it; the per-
//! chromosome parts merge into the final artifacts.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use grr_repository::{DirectoryProtocol, Resource};

use crate::config::ScoreConfig;
use crate::error::Result;
use crate::histogram::{MinMax, NumberHistogram};
use crate::score::GenomicScore;

pub const STATISTICS_DIR: &str = "statistics";

pub fn histogram_filename(score_id: &str) -> String {
    format!("{}/histogram_{}.yaml", STATISTICS_DIR, score_id)
}

pub fn min_max_filename(score_id: &str) -> String {
    format!("{}/min_max_{}.yaml", STATISTICS_DIR, score_id)
}

pub const STATS_HASH_FILE: &str = "statistics/stats_hash";

/// Statistics of one score over some set of chromosomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistics {
    pub min_max: MinMax,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<NumberHistogram>,
}

impl ScoreStatistics {
    pub fn merge(&mut self, other: &ScoreStatistics) -> Result<()> {
        self.min_max.merge(&other.min_max);
        match (&mut self.histogram, &other.histogram) {
            (Some(mine), Some(theirs)) => mine.merge(theirs)?,
            (None, Some(theirs)) => self.histogram = Some(theirs.clone()),
            _ => {}
        }
        Ok(())
    }
}

/// Compute the statistics of every numeric score over one chromosome.
///
/// Row values are weighted by row length, matching per-position
/// semantics.
pub fn chromosome_statistics(
    score: &mut GenomicScore,
    chrom: &str,
) -> Result<Vec<ScoreStatistics>> {
    let score_count = score.config().scores.len();
    let mut parts: Vec<ScoreStatistics> = Vec::with_capacity(score_count);
    for def in &score.config().scores {
        let histogram = match (&def.histogram, def.value_type.is_numeric()) {
            (Some(config), true) => Some(NumberHistogram::new(&def.id, config.clone())?),
            _ => None,
        };
        parts.push(ScoreStatistics {
            min_max: MinMax::new(&def.id),
            histogram,
        });
    }

    let lines = score.fetch_lines(chrom, None, None)?;
    for line in &lines {
        let count = line.len();
        for index in 0..score_count {
            let Some(value) = score.line_value(line, index) else {
                continue;
            };
            let Some(value) = value.as_f64() else {
                continue;
            };
            parts[index].min_max.add_count(value, count);
            if let Some(histogram) = &mut parts[index].histogram {
                histogram.add_count(value, count);
            }
        }
    }
    Ok(parts)
}

/// Merge per-chromosome parts, one vector per chromosome.
pub fn merge_statistics(
    mut parts: Vec<Vec<ScoreStatistics>>,
) -> Result<Vec<ScoreStatistics>> {
    let Some(mut merged) = parts.pop() else {
        return Ok(Vec::new());
    };
    for part in &parts {
        for (target, source) in merged.iter_mut().zip(part) {
            target.merge(source)?;
        }
    }
    Ok(merged)
}

/// Store merged statistics and the stats hash into a resource of a
/// directory repository.
pub fn save_statistics(
    proto: &DirectoryProtocol,
    resource: &Resource,
    statistics: &[ScoreStatistics],
) -> Result<()> {
    for stats in statistics {
        let min_max_text = serde_yaml::to_string(&stats.min_max)?;
        proto.store_file(
            resource.entry(),
            &min_max_filename(&stats.min_max.score_id),
            &mut min_max_text.as_bytes(),
        )?;
        if let Some(histogram) = &stats.histogram {
            let histogram_text = serde_yaml::to_string(histogram)?;
            proto.store_file(
                resource.entry(),
                &histogram_filename(&histogram.score_id),
                &mut histogram_text.as_bytes(),
            )?;
        }
    }
    let hash = stats_hash(resource)?;
    proto.store_file(resource.entry(), STATS_HASH_FILE, &mut hash.as_bytes())?;
    Ok(())
}

/// Load the stored statistics of one score, if present.
pub fn load_statistics(
    resource: &Resource,
    score_id: &str,
) -> Result<Option<ScoreStatistics>> {
    if !resource.file_exists(&min_max_filename(score_id))? {
        return Ok(None);
    }
    let min_max: MinMax =
        serde_yaml::from_str(&resource.file_string(&min_max_filename(score_id))?)?;
    let histogram = if resource.file_exists(&histogram_filename(score_id))? {
        Some(serde_yaml::from_str(
            &resource.file_string(&histogram_filename(score_id))?,
        )?)
    } else {
        None
    };
    Ok(Some(ScoreStatistics { min_max, histogram }))
}

/// Hash of the statistics inputs: the score configuration and the
/// manifest entry of the table file. A changed hash means the stored
/// statistics are stale.
pub fn stats_hash(resource: &Resource) -> Result<String> {
    let config: ScoreConfig = resource.config().deserialize(resource.id())?;
    let manifest = resource.manifest()?;
    let table_entry = manifest.get(&config.table.filename);

    let mut hasher = Md5::new();
    hasher.update(serde_yaml::to_string(&config)?.as_bytes());
    if let Some(entry) = table_entry {
        hasher.update(entry.md5.as_bytes());
        hasher.update(entry.size.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Are the stored statistics up to date with the current inputs?
pub fn statistics_up_to_date(resource: &Resource) -> Result<bool> {
    if !resource.file_exists(STATS_HASH_FILE)? {
        return Ok(false);
    }
    let stored = resource.file_string(STATS_HASH_FILE)?;
    Ok(stored.trim() == stats_hash(resource)?)
}
