use std::path::PathBuf;

use clap::Args;

use super::Task;
use crate::errors::CommandError;
use crate::progress::ProgressObserver;
use crate::subcommand_def;
use crate::upload::archive::extract_primary_geometry_file;
use crate::upload::loader::list_layers;

subcommand_def!{
    /// Lists the layers in a file that could be uploaded, in the order they are stored
    pub(crate) struct Layers {

        /// A .zip, .gpkg or .shp file
        source: PathBuf,

    }
}

impl Task for Layers {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        let bytes = std::fs::read(&self.source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::FileNotFound(self.source.clone()),
            _ => CommandError::IoError(e)
        })?;
        let filename = self.source.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        // goes through the same unpacking as an upload, so a zip is looked into
        let extracted = extract_primary_geometry_file(&bytes, &filename, progress)?;
        for layer in list_layers(extracted.path())? {
            println!("{layer}");
        }
        Ok(())
    }
}
