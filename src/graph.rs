use crate::transfer_pattern::TransferPatternIndex;
use crate::transit_data::TransitData;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const GRAPH_FILENAME: &str = "graph.json";
pub const CHUNK_PREFIX: &str = "chunk_";
pub const MERGED_DIR: &str = "merged";

pub fn chunk_filename(n: usize, m: usize) -> String {
    format!("{}{}_{}", CHUNK_PREFIX, n, m)
}

/// The persisted unit : a timetable graph together with its
/// transfer-pattern index. Cross-file identity of stops and patterns relies
/// only on labels and codes.
#[derive(Debug, Serialize, Deserialize)]
pub struct Graph {
    pub transit: TransitData,
    pub tp: TransferPatternIndex,
}

impl Graph {
    pub fn new(transit: TransitData, tp: TransferPatternIndex) -> Self {
        Self { transit, tp }
    }

    pub fn save(&self, path: &Path) -> Result<(), GraphIoError> {
        let file =
            File::create(path).map_err(|err| GraphIoError::Io(path.to_path_buf(), err))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)
            .map_err(|err| GraphIoError::Serde(path.to_path_buf(), err))
    }

    pub fn load(path: &Path) -> Result<Self, GraphIoError> {
        let file = File::open(path).map_err(|err| GraphIoError::Io(path.to_path_buf(), err))?;
        let reader = BufReader::new(file);
        let mut graph: Graph = serde_json::from_reader(reader)
            .map_err(|err| GraphIoError::Serde(path.to_path_buf(), err))?;
        graph.transit.rebuild_lookups();
        graph.tp.rebuild_lookups();
        Ok(graph)
    }
}

#[derive(Debug)]
pub enum GraphIoError {
    Io(PathBuf, std::io::Error),
    Serde(PathBuf, serde_json::Error),
}

impl Display for GraphIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphIoError::Io(path, err) => {
                write!(f, "I/O error on graph file {:?} : {}", path, err)
            }
            GraphIoError::Serde(path, err) => {
                write!(f, "Invalid graph file {:?} : {}", path, err)
            }
        }
    }
}

impl std::error::Error for GraphIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphIoError::Io(_, err) => Some(err),
            GraphIoError::Serde(_, err) => Some(err),
        }
    }
}
