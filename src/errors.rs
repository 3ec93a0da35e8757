use std::error::Error;
use std::fmt::Display;
use std::io::Error as IoError;
use std::path::PathBuf;

pub(crate) use gdal::errors::GdalError;
use serde_json::Error as JsonError;
use walkdir::Error as WalkDirError;
use zip::result::ZipError;

pub(crate) use clap::error::Error as ArgumentError;

#[derive(Debug)]
pub(crate) enum CommandError {
    // ingestion taxonomy, these are the errors a user sees for a bad upload
    UnsupportedFormat(String),
    NoGeometryFileFound,
    LayerRequired(Vec<String>),
    MissingProjection(String),
    CorruptSource(String),
    FileNotFound(PathBuf),
    NoGeometry,
    SimplificationFailed(String),
    // infrastructure
    GdalError(GdalError),
    IoError(IoError),
    UnknownLayer(String),
    NoPendingContainer,
    InvalidManifest(String),
    ManifestRead(String),
    PayloadWrite(String),
    JsonWrite(String),
}

impl Error for CommandError {

}

impl Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat(a) => write!(f,"Unsupported upload format '{a}', expected a .zip, .gpkg or .shp file."),
            Self::NoGeometryFileFound => write!(f,"No .shp file found in the zip."),
            Self::LayerRequired(a) => write!(f,"A layer must be selected before loading this container. Available layers: {}",a.join(", ")),
            Self::MissingProjection(a) => write!(f,"Source '{a}' has no coordinate reference system, it can not be placed on the map."),
            Self::CorruptSource(a) => write!(f,"Error reading geometry source: {a}"),
            Self::FileNotFound(a) => write!(f,"File not found: {}",a.display()),
            Self::NoGeometry => write!(f,"No geometry available to compute a view from."),
            Self::SimplificationFailed(a) => write!(f,"Geometry simplification failed: {a}"),
            Self::GdalError(a) => write!(f,"gdal: {a}"),
            Self::IoError(a) => write!(f,"io: {a}"),
            Self::UnknownLayer(a) => write!(f,"Layer '{a}' is not loaded."),
            Self::NoPendingContainer => write!(f,"No uploaded container is waiting for a layer selection."),
            Self::InvalidManifest(a) => write!(f,"Invalid base layer manifest: {a}"),
            Self::ManifestRead(a) => write!(f,"Error reading base layer manifest: {a}"),
            Self::PayloadWrite(a) => write!(f,"Error writing render payload: {a}"),
            Self::JsonWrite(a) => write!(f,"Error writing JSON: {a}"),
        }
    }
}

impl From<GdalError> for CommandError {

    fn from(value: GdalError) -> Self {
        Self::GdalError(value)
    }
}

impl From<IoError> for CommandError {

    fn from(value: IoError) -> Self {
        Self::IoError(value)
    }
}

impl From<ZipError> for CommandError {

    // a zip that can't be read is a bad upload, not a program failure
    fn from(value: ZipError) -> Self {
        Self::CorruptSource(format!("{value}"))
    }
}

impl From<WalkDirError> for CommandError {

    fn from(value: WalkDirError) -> Self {
        Self::IoError(value.into())
    }
}

impl From<JsonError> for CommandError {

    fn from(value: JsonError) -> Self {
        Self::JsonWrite(format!("{value}"))
    }
}

#[derive(Debug)]
pub(crate) enum ProgramError {
    ArgumentError(ArgumentError),
    CommandError(CommandError)
}

impl Error for ProgramError {

}

impl Display for ProgramError {

    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArgumentError(a) => write!(f,"{a}"),
            Self::CommandError(a) => write!(f,"{a}"),
        }
    }
}

impl From<ArgumentError> for ProgramError {

    fn from(value: ArgumentError) -> Self {
        Self::ArgumentError(value)
    }
}

impl From<CommandError> for ProgramError {

    fn from(value: CommandError) -> Self {
        Self::CommandError(value)
    }
}
