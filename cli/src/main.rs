use anyhow::{bail, Context};
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;
use tresse::builder::BuildConfig;
use tresse::graph::{chunk_filename, Graph, GRAPH_FILENAME, MERGED_DIR};
use tresse::logger::init_logger;
use tresse::merge::merge_chunks;
use tresse::tracing::info;
use tresse::{DelayPolicy, NaiveDate};

#[derive(StructOpt)]
#[structopt(
    name = "tresse",
    about = "Build and merge transfer patterns.",
    rename_all = "snake_case"
)]
enum Options {
    /// Build one chunk of transfer patterns from a timetable graph
    Build(BuildArgs),
    /// Merge previously built chunks into one graph
    Merge(MergeArgs),
}

#[derive(StructOpt)]
struct BuildArgs {
    /// path to the timetable graph file
    #[structopt(short = "i", long = "input", parse(from_os_str))]
    input: PathBuf,

    /// directory to write the chunk file into
    #[structopt(short = "d", long = "dir", parse(from_os_str), default_value = ".")]
    dir: PathBuf,

    /// total number of chunks
    #[structopt(long, default_value = "1")]
    chunks: usize,

    /// number of the chunk to build, starting with 1
    #[structopt(long, default_value = "1")]
    chunk: usize,

    /// delay policy used to derive dynamic patterns :
    /// "none", "simple", "restricted:<k>" or "powerset:<k>"
    #[structopt(long, default_value = "simple")]
    delay_policy: DelayPolicy,

    /// service day all construction searches are anchored to,
    /// formatted like 2020-01-06
    #[structopt(long, default_value = "2020-01-06")]
    reference_date: NaiveDate,
}

#[derive(StructOpt)]
struct MergeArgs {
    /// directory containing the chunk files
    #[structopt(short = "d", long = "dir", parse(from_os_str))]
    dir: PathBuf,

    /// total number of chunks to merge
    #[structopt(long)]
    chunks: usize,
}

fn main() {
    init_logger();
    if let Err(err) = run() {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    match Options::from_args() {
        Options::Build(args) => build(args),
        Options::Merge(args) => merge(args),
    }
}

fn build(args: BuildArgs) -> anyhow::Result<()> {
    if args.chunk < 1 || args.chunk > args.chunks {
        bail!(
            "Invalid chunk number {} for {} chunks.",
            args.chunk,
            args.chunks
        );
    }

    let graph = Graph::load(&args.input)
        .with_context(|| format!("Could not load the timetable graph {:?}", args.input))?;

    let config = BuildConfig {
        chunk: args.chunk,
        nb_of_chunks: args.chunks,
        delay_policy: args.delay_policy,
        reference_date: args.reference_date,
    };
    let index = tresse::build(&graph.transit, &config);

    let output = args.dir.join(chunk_filename(args.chunk, args.chunks));
    Graph::new(graph.transit, index)
        .save(&output)
        .with_context(|| format!("Could not save the chunk {:?}", output))?;
    info!("wrote {:?}", output);
    Ok(())
}

fn merge(args: MergeArgs) -> anyhow::Result<()> {
    let graph = merge_chunks(&args.dir, args.chunks)
        .with_context(|| format!("Could not merge the chunks of {:?}", args.dir))?;

    let merged_dir = args.dir.join(MERGED_DIR);
    fs::create_dir_all(&merged_dir)
        .with_context(|| format!("Could not create the output directory {:?}", merged_dir))?;
    let output = merged_dir.join(GRAPH_FILENAME);
    if let Err(err) = graph.save(&output) {
        // a half-written artifact must not survive
        let _ = fs::remove_file(&output);
        return Err(err).with_context(|| format!("Could not save the merged graph {:?}", output));
    }
    info!("wrote {:?}", output);
    Ok(())
}
