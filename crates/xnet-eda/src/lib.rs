//! Schematic decoders for the two supported EDA ecosystems.
//!
//! * [`altium`] – binary `.SchDoc` compound documents and `.PrjPcb` project
//!   files, decoded through the record stream and spatial net extraction.
//! * [`cadence`] – the textual `pstxnet.dat`/`pstxprt.dat`/`pstchip.dat`
//!   companion triple exported alongside `.dsn`/`.cpm` design files.
//!
//! Both produce an [`xnet_sch::Netlist`]; [`parse_design`] dispatches on the
//! file extension.

pub mod altium;
pub mod cadence;

use std::path::{Path, PathBuf};

use thiserror::Error;
use xnet_sch::Netlist;

/// Design-file extensions [`parse_design`] understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["schdoc", "prjpcb", "dsn", "cpm"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(
        "unsupported design format '{0}'; supported extensions: .SchDoc, .PrjPcb, .dsn, .cpm"
    )]
    UnsupportedFormat(String),
    #[error(transparent)]
    Container(#[from] xnet_cfb::CfbError),
    #[error("record stream truncated ({0})")]
    TruncatedStream(&'static str),
    #[error(
        "missing Cadence companion file(s) {missing:?} under {dir}; \
         re-export the netlist to produce pstxnet.dat, pstxprt.dat and pstchip.dat"
    )]
    MissingCompanions { dir: PathBuf, missing: Vec<String> },
    #[error("no schematic documents listed in project {0}")]
    EmptyProject(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decode any supported design file into the universal netlist model.
pub fn parse_design(path: &Path) -> Result<Netlist, DecodeError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "schdoc" => altium::parse_schdoc(path),
        "prjpcb" => altium::parse_project(path),
        "dsn" | "cpm" => cadence::parse_design(path),
        _ => Err(DecodeError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}
