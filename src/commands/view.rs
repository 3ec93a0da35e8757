use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use clap::Args;

use super::ManifestArg;
use super::Task;
use crate::errors::CommandError;
use crate::layers::LayerCategory;
use crate::layers::LayerVisibility;
use crate::progress::ProgressObserver;
use crate::session::BaseLoadMode;
use crate::session::Session;
use crate::session::UploadOutcome;
use crate::subcommand_def;
use crate::upload::archive::UploadFormat;

/// An upload given on the command line, `path` or `path#layer`.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) struct UploadArg {
    path: PathBuf,
    layer: Option<String>
}

impl UploadArg {

    /// Only a GeoPackage can have a layer, so a `#` anywhere else is part of the file name.
    pub(crate) fn parse(value: &str) -> Self {
        let split = value.match_indices('#').map(|(index,_)| (&value[..index],&value[index + 1..])).find(|(path,_)| {
            UploadFormat::from_filename(path).is_ok_and(UploadFormat::is_container)
        });
        match split {
            Some((path,layer)) => Self {
                path: PathBuf::from(path),
                layer: (!layer.is_empty()).then(|| layer.to_owned())
            },
            None => Self {
                path: PathBuf::from(value),
                layer: None
            }
        }
    }

    fn from_arg(value: &str) -> Result<Self,String> {
        Ok(Self::parse(value))
    }

    fn filename(&self) -> String {
        self.path.file_name().map_or_else(|| self.path.display().to_string(), |name| name.to_string_lossy().into_owned())
    }
}

subcommand_def!{
    /// Loads base layers and uploads, then writes what the map should draw as a JSON render payload
    pub(crate) struct View {

        /// The file to write the render payload to
        output: PathBuf,

        #[clap(flatten)]
        manifest_arg: ManifestArg,

        #[arg(long)]
        /// Load every base layer at start instead of when it is first shown
        eager: bool,

        #[arg(long,value_parser=UploadArg::from_arg)]
        /// A boundary to upload (.zip, .gpkg or .shp). For a GeoPackage, pick the layer with 'sites.gpkg#layer'. May be repeated.
        upload: Vec<UploadArg>,

        #[arg(long)]
        /// A base layer to show. May be repeated.
        show: Vec<String>,

        #[arg(long)]
        /// Show every base layer
        show_all: bool,

        #[arg(long)]
        /// An uploaded layer to hide. May be repeated.
        hide: Vec<String>,

        #[arg(long,conflicts_with="zoom_all")]
        /// Fit the view to this layer, instead of the last upload
        zoom_to: Option<String>,

        #[arg(long)]
        /// Fit the view to every visible layer
        zoom_all: bool,

    }
}

impl View {

    fn upload<Progress: ProgressObserver>(session: &mut Session, upload: &UploadArg, progress: &mut Progress) -> Result<(),CommandError> {
        let filename = upload.filename();
        let bytes = std::fs::read(&upload.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::FileNotFound(upload.path.clone()),
            _ => CommandError::IoError(e)
        })?;

        let outcome = match session.handle_upload(&bytes, &filename, progress)? {
            UploadOutcome::LayerSelectionRequired { layers } => match &upload.layer {
                Some(layer) => session.load_selected_layer(layer, progress)?,
                None => {
                    progress.warning(|| format!("{filename} has several layers, pick one with '{}#<layer>'. Available layers: {}",upload.path.display(),layers.join(", ")));
                    return Ok(())
                }
            },
            outcome @ UploadOutcome::Loaded { .. } => {
                if upload.layer.is_some() {
                    progress.warning(|| format!("{filename} only has one layer, the layer selection was ignored."));
                }
                outcome
            }
        };

        if let UploadOutcome::Loaded { name, added: false, .. } = outcome {
            progress.warning(|| format!("{name} was already uploaded."));
        }
        Ok(())
    }

    fn write_payload(session: &Session, visibility: &LayerVisibility, output: &Path) -> Result<(),CommandError> {
        let json = session.render_payload(visibility).to_json()?;
        let mut file = File::create(output).map_err(|e| CommandError::PayloadWrite(format!("{}: {e}",output.display())))?;
        file.write_all(json.as_bytes()).map_err(|e| CommandError::PayloadWrite(format!("{}: {e}",output.display())))?;
        Ok(())
    }
}

impl Task for View {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {

        let manifest = self.manifest_arg.load()?;
        let mode = if self.eager {
            BaseLoadMode::Eager
        } else {
            BaseLoadMode::OnDemand
        };

        let mut session = Session::new(manifest, mode, progress);
        let mut visibility = LayerVisibility::default();

        // Everything from here on is something a user did. If it fails they're told, and the map carries on without it.

        let shown: Vec<String> = if self.show_all {
            session.manifest().descriptors().iter().map(|descriptor| descriptor.display_name.clone()).collect()
        } else {
            self.show
        };
        for name in shown {
            if let Err(err) = session.show_base_layer(&name, &mut visibility, progress) {
                progress.warning(|| format!("Error loading {name}: {err}"))
            }
        }

        if !self.upload.is_empty() {
            progress.announce("Loading uploads");
        }
        for upload in &self.upload {
            if let Err(err) = Self::upload(&mut session, upload, progress) {
                progress.warning(|| format!("Error processing {}: {err}",upload.path.display()))
            }
        }

        for name in &self.hide {
            if session.registry().contains(LayerCategory::User, name) {
                visibility.set(LayerCategory::User, name, false)
            } else {
                progress.warning(|| format!("Can't hide {name}, no upload has that name."))
            }
        }

        if let Some(name) = &self.zoom_to {
            if let Err(err) = session.zoom_to_layer(name) {
                progress.warning(|| format!("Can't zoom to {name}: {err}"))
            }
        } else if self.zoom_all {
            if let Err(err) = session.zoom_to_visible(&visibility) {
                progress.warning(|| format!("Can't zoom to the visible layers: {err}"))
            }
        }

        progress.message(|| format!("{} uploaded layers loaded.",session.registry().len(LayerCategory::User)));
        let view = session.view();
        progress.message(|| format!("View centered on {:.5}, {:.5} at zoom {}.",view.center_latitude,view.center_longitude,view.zoom_level));

        Self::write_payload(&session, &visibility, &self.output)

    }
}
