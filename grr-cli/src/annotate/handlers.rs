use std::fs;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};

use grr_annotation::build_pipeline_str;
use grr_core::Annotatable;
use grr_repository::{RepositoriesConfig, build_group};

/// Column layout of the input file, resolved from its header line.
///
/// `chrom` and `pos` are required; `pos_end` upgrades a record to a
/// region, `ref` + `alt` to a VCF allele.
struct InputColumns {
    chrom: usize,
    pos: usize,
    pos_end: Option<usize>,
    reference: Option<usize>,
    alternative: Option<usize>,
}

impl InputColumns {
    fn from_header(header: &[&str]) -> Result<InputColumns> {
        let find = |name: &str| header.iter().position(|column| *column == name);
        let chrom = find("chrom")
            .or_else(|| find("chromosome"))
            .context("the input header has no <chrom> column")?;
        let pos = find("pos")
            .or_else(|| find("pos_begin"))
            .context("the input header has no <pos> column")?;
        Ok(InputColumns {
            chrom,
            pos,
            pos_end: find("pos_end"),
            reference: find("ref").or_else(|| find("reference")),
            alternative: find("alt").or_else(|| find("alternative")),
        })
    }

    fn annotatable(&self, fields: &[&str]) -> Option<Annotatable> {
        let chrom = *fields.get(self.chrom)?;
        let pos: u64 = fields.get(self.pos)?.parse().ok()?;
        if chrom.is_empty() {
            return None;
        }
        let reference = self
            .reference
            .and_then(|index| fields.get(index).copied())
            .filter(|field| !field.is_empty());
        let alternative = self
            .alternative
            .and_then(|index| fields.get(index).copied())
            .filter(|field| !field.is_empty());
        if let (Some(reference), Some(alternative)) = (reference, alternative) {
            return Annotatable::vcf_allele(chrom, pos, reference, alternative).ok();
        }
        if let Some(pos_end) = self
            .pos_end
            .and_then(|index| fields.get(index))
            .and_then(|field| field.parse().ok())
        {
            return Annotatable::region(chrom, pos, pos_end).ok();
        }
        Some(Annotatable::position(chrom, pos))
    }
}

pub fn run_annotate(matches: &ArgMatches) -> Result<()> {
    let pipeline_file = matches
        .get_one::<String>("pipeline")
        .expect("A pipeline configuration file is required");
    let grr_file = matches
        .get_one::<String>("grr")
        .expect("A repository definition file is required");
    let allow_repeated = matches.get_flag("allow-repeated-attributes");

    let definitions = fs::read_to_string(grr_file)
        .with_context(|| format!("reading repository definitions from <{}>", grr_file))?;
    let repositories = build_group(&RepositoriesConfig::from_yaml_str(&definitions)?)?;

    let pipeline_config = fs::read_to_string(pipeline_file)
        .with_context(|| format!("reading pipeline configuration from <{}>", pipeline_file))?;
    let mut pipeline = build_pipeline_str(&repositories, &pipeline_config, allow_repeated)?;

    if matches.get_flag("describe") {
        print!("{}", pipeline.describe());
        return Ok(());
    }

    let Some(input) = matches.get_one::<String>("input") else {
        bail!("an input file is required unless --describe is given");
    };
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("opening input file <{}>", input))?,
    );
    let mut lines = reader.lines();
    let header_line = lines
        .next()
        .transpose()?
        .context("the input file is empty")?;
    let header: Vec<&str> = header_line.split('\t').collect();
    let columns = InputColumns::from_header(&header)?;

    let attribute_names: Vec<String> = pipeline
        .visible_attributes()
        .iter()
        .map(|info| info.name.clone())
        .collect();

    let mut writer: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output file <{}>", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    writeln!(writer, "{}\t{}", header_line, attribute_names.join("\t"))?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} records annotated")
            .expect("a valid progress template"),
    );

    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let annotatable = columns.annotatable(&fields);
        if annotatable.is_none() {
            tracing::warn!(record = %line, "unparsable input record gets no annotation");
        }
        let result = pipeline.annotate(annotatable.as_ref())?;
        let values: Vec<String> = attribute_names
            .iter()
            .map(|name| {
                result
                    .get(name)
                    .and_then(|value| value.as_ref())
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        writeln!(writer, "{}\t{}", line, values.join("\t"))?;
        progress.inc(1);
    }
    progress.finish_and_clear();
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_resolution() {
        let header = vec!["chrom", "pos", "ref", "alt", "extra"];
        let columns = InputColumns::from_header(&header).unwrap();
        assert_eq!(columns.chrom, 0);
        assert_eq!(columns.pos, 1);
        assert_eq!(columns.reference, Some(2));
        assert_eq!(columns.alternative, Some(3));
        assert_eq!(columns.pos_end, None);
    }

    #[test]
    fn test_header_without_position_rejected() {
        assert!(InputColumns::from_header(&["chrom", "ref", "alt"]).is_err());
    }

    #[test]
    fn test_record_kinds() {
        let header = vec!["chrom", "pos", "pos_end", "ref", "alt"];
        let columns = InputColumns::from_header(&header).unwrap();

        let allele = columns
            .annotatable(&["chr1", "10", "", "A", "G"])
            .unwrap();
        assert_eq!(
            allele,
            Annotatable::vcf_allele("chr1", 10, "A", "G").unwrap()
        );

        let region = columns.annotatable(&["chr1", "10", "20", "", ""]).unwrap();
        assert_eq!(region, Annotatable::region("chr1", 10, 20).unwrap());

        let position = columns.annotatable(&["chr1", "10", "", "", ""]).unwrap();
        assert_eq!(position, Annotatable::position("chr1", 10));
    }

    #[test]
    fn test_bad_position_is_unparsable() {
        let header = vec!["chrom", "pos"];
        let columns = InputColumns::from_header(&header).unwrap();
        assert_eq!(columns.annotatable(&["chr1", "ten"]), None);
        assert_eq!(columns.annotatable(&["", "10"]), None);
    }
}
