use clap::{Arg, ArgAction, Command};

pub const ANNOTATE_CMD: &str = "annotate";

pub fn create_annotate_cli() -> Command {
    Command::new(ANNOTATE_CMD)
        .about("Annotate a tab-separated variants file with an annotation pipeline")
        .arg(
            Arg::new("pipeline")
                .long("pipeline")
                .short('p')
                .required(true)
                .help("Annotation pipeline configuration file (YAML)"),
        )
        .arg(
            Arg::new("grr")
                .long("grr")
                .short('g')
                .required(true)
                .help("Repository definition file (YAML)"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .help("Input TSV file with a header line; required unless --describe is given"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output TSV file; stdout when omitted"),
        )
        .arg(
            Arg::new("describe")
                .long("describe")
                .action(ArgAction::SetTrue)
                .help("Print the pipeline annotators and their attributes, then exit"),
        )
        .arg(
            Arg::new("allow-repeated-attributes")
                .long("allow-repeated-attributes")
                .action(ArgAction::SetTrue)
                .help("Rename repeated attribute names instead of rejecting the pipeline"),
        )
}
