use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;

use grr_repository::{DirectoryProtocol, Repository};
use grr_scores::{HistogramScale, NumberHistogram, ViewRange, load_statistics};

const CHART_WIDTH: usize = 50;

fn bin_edge(histogram: &NumberHistogram, range: ViewRange, index: usize) -> f64 {
    let bins = histogram.bars.len() as f64;
    let fraction = index as f64 / bins;
    match histogram.config.scale {
        HistogramScale::Linear => range.min + fraction * (range.max - range.min),
        HistogramScale::Log => {
            (range.min.ln() + fraction * (range.max.ln() - range.min.ln())).exp()
        }
    }
}

fn render_histogram(histogram: &NumberHistogram) -> Result<String> {
    // a hand-edited statistics file can lack the view range
    let range = histogram
        .config
        .view_range
        .context("stored histogram has no view range")?;
    let mut out = String::new();
    let peak = histogram.bars.iter().copied().max().unwrap_or(0).max(1);
    for (index, bar) in histogram.bars.iter().enumerate() {
        let low = bin_edge(histogram, range, index);
        let high = bin_edge(histogram, range, index + 1);
        let width = (*bar as usize * CHART_WIDTH) / peak as usize;
        out.push_str(&format!(
            "[{:>10.4}, {:>10.4})  {:<width$} {}\n",
            low,
            high,
            "#".repeat(width),
            bar,
            width = CHART_WIDTH,
        ));
    }
    Ok(out)
}

pub fn run_hist(matches: &ArgMatches) -> Result<()> {
    let root = matches
        .get_one::<String>("repository")
        .expect("A repository root is required");
    let resource_id = matches
        .get_one::<String>("resource")
        .expect("A score resource id is required");
    let score_id = matches
        .get_one::<String>("score")
        .expect("A score id is required");

    let repository = Repository::new(Arc::new(DirectoryProtocol::new(
        "local",
        Path::new(root),
    )));
    let resource = repository.get_resource(resource_id, None)?;
    let stats = load_statistics(&resource, score_id)?.with_context(|| {
        format!(
            "no stored statistics for score <{}> of <{}>; run `grr stats` first",
            score_id,
            resource.full_id()
        )
    })?;

    println!(
        "{}: {} values in [{}, {}]",
        score_id,
        stats.min_max.count,
        stats.min_max.min.map_or("-".to_string(), |v| v.to_string()),
        stats.min_max.max.map_or("-".to_string(), |v| v.to_string()),
    );
    match &stats.histogram {
        Some(histogram) => {
            let chart = render_histogram(histogram).with_context(|| {
                format!(
                    "malformed statistics for score <{}> of <{}>",
                    score_id,
                    resource.full_id()
                )
            })?;
            print!("{}", chart);
        }
        None => println!("no histogram is configured for this score"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use grr_scores::{HistogramConfig, ViewRange};

    fn histogram() -> NumberHistogram {
        let config = HistogramConfig {
            scale: HistogramScale::Linear,
            number_of_bins: 4,
            view_range: Some(ViewRange { min: 0.0, max: 1.0 }),
        };
        let mut histogram = NumberHistogram::new("phast", config).unwrap();
        histogram.add_count(0.1, 3);
        histogram.add_count(0.6, 1);
        histogram.add_count(0.9, 2);
        histogram
    }

    #[test]
    fn test_bin_edges() {
        let histogram = histogram();
        let range = histogram.config.view_range.unwrap();
        assert_eq!(bin_edge(&histogram, range, 0), 0.0);
        assert_eq!(bin_edge(&histogram, range, 2), 0.5);
        assert_eq!(bin_edge(&histogram, range, 4), 1.0);
    }

    #[test]
    fn test_render_marks_every_bin() {
        let rendered = render_histogram(&histogram()).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" 3"));
        assert!(lines[1].ends_with(" 0"));
        assert!(lines[3].ends_with(" 2"));
    }

    #[test]
    fn test_missing_view_range_is_an_error_not_a_panic() {
        let mut histogram = histogram();
        histogram.config.view_range = None;
        let error = render_histogram(&histogram).unwrap_err();
        assert!(error.to_string().contains("no view range"));
    }
}
