use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use super::Rgba;
use crate::errors::CommandError;
use crate::progress::ProgressObserver;

/// The colors a base layer can be drawn in. All of them are drawn with the same transparency.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize,JsonSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NamedColor {
    Blue,
    Red,
    Green,
    Purple,
    Orange,
    DarkBlue,
    DarkRed,
    DarkGreen,
    CadetBlue,
    Pink,
    LightBlue,
    LightGreen,
    Beige,
    Gray,
    Black,
    Brown,
    Cyan,
    Magenta
}

impl NamedColor {

    const ALPHA: u8 = 140;

    pub(crate) const fn rgba(self) -> Rgba {
        let [red,green,blue] = match self {
            Self::Blue => [0,0,255],
            Self::Red => [255,0,0],
            Self::Green => [0,255,0],
            Self::Purple => [128,0,128],
            Self::Orange => [255,165,0],
            Self::DarkBlue => [0,0,139],
            Self::DarkRed => [139,0,0],
            Self::DarkGreen => [0,100,0],
            Self::CadetBlue => [95,158,160],
            Self::Pink => [255,192,203],
            Self::LightBlue => [173,216,230],
            Self::LightGreen => [144,238,144],
            Self::Beige => [245,245,220],
            Self::Gray => [128,128,128],
            Self::Black => [0,0,0],
            Self::Brown => [165,42,42],
            Self::Cyan => [0,255,255],
            Self::Magenta => [255,0,255],
        };
        [red,green,blue,Self::ALPHA]
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize,JsonSchema)]
#[serde(deny_unknown_fields)]
/// One layer inside a base container.
pub(crate) struct LayerSource {
    /// The layer's name inside the container
    pub(crate) layer: String,
    pub(crate) color: NamedColor,
    /// The name shown to the user, defaults to the layer name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize,JsonSchema)]
#[serde(deny_unknown_fields)]
/// A GeoPackage holding base layers.
pub(crate) struct ContainerSource {
    /// Path to the container, relative to the data directory
    pub(crate) path: PathBuf,
    pub(crate) layers: Vec<LayerSource>,
    /// Tolerance, in the container's own units, used when pre-simplifying the container offline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) simplify_tolerance: Option<f64>
}

impl ContainerSource {

    fn new(path: &str, simplify_tolerance: f64, layers: &[(&str,NamedColor)]) -> Self {
        Self {
            path: PathBuf::from(path),
            layers: layers.iter().map(|(layer,color)| LayerSource {
                layer: (*layer).to_owned(),
                color: *color,
                name: None
            }).collect(),
            simplify_tolerance: Some(simplify_tolerance)
        }
    }
}

/// Where one base layer comes from and how it is shown.
#[derive(Clone,Debug,PartialEq)]
pub(crate) struct LayerSourceDescriptor {
    pub(crate) container_path: PathBuf,
    pub(crate) layer_identifier: String,
    pub(crate) display_color: Rgba,
    pub(crate) display_name: String
}

/// The validated list of base layers.
#[derive(Clone,Debug)]
pub(crate) struct BaseManifest {
    data_dir: PathBuf,
    containers: Vec<ContainerSource>,
    descriptors: Vec<LayerSourceDescriptor>
}

impl BaseManifest {

    pub(crate) const DEFAULT_DATA_DIR: &'static str = "custom_repository/data";

    pub(crate) fn default_sources() -> Vec<ContainerSource> {
        use NamedColor::*;
        vec![
            ContainerSource::new("Sensitive_Parties.gpkg", 0.0005, &[
                ("canals_on_the_trust_network",Pink),
                ("dry_docks",LightBlue),
                ("network_rail_centre_lines",LightGreen),
                ("nwr_elrs",Beige),
            ]),
            ContainerSource::new("Environmental_Designations.gpkg", 0.003, &[
                ("aonb",Blue),
                ("country_parks",Red),
                ("local_nature_reserves",Green),
                ("national_nature_reserves",Purple),
                ("national_parks",Orange),
                ("ramsar",DarkBlue),
                ("sac",DarkRed),
                ("spa",DarkGreen),
                ("sssi",CadetBlue),
            ]),
            ContainerSource::new("Special_Category_Land.gpkg", 0.003, &[
                ("conservation_areas",Gray),
                ("crow_act_2000",Black),
                ("national_trust_land_always_open",Brown),
                ("national_trust_limited_access",Cyan),
                ("open_greenspace",Magenta),
            ]),
        ]
    }

    /// Checks the sources and resolves them against the data directory. Nothing here touches the
    /// filesystem, see [`Self::warn_missing_containers`].
    pub(crate) fn from_sources<AsPath: AsRef<Path>>(containers: Vec<ContainerSource>, data_dir: AsPath) -> Result<Self,CommandError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let mut names = HashSet::new();
        let mut descriptors = Vec::new();

        for container in &containers {
            if container.path.as_os_str().is_empty() {
                return Err(CommandError::InvalidManifest("a container has an empty path".to_owned()))
            }
            if let Some(tolerance) = container.simplify_tolerance {
                if !(tolerance.is_finite() && tolerance >= 0.0) {
                    return Err(CommandError::InvalidManifest(format!("simplify_tolerance for {} must be a non-negative number",container.path.display())))
                }
            }
            let container_path = data_dir.join(&container.path);
            for layer in &container.layers {
                if layer.layer.trim().is_empty() {
                    return Err(CommandError::InvalidManifest(format!("a layer in {} has an empty layer name",container.path.display())))
                }
                let display_name = layer.name.clone().unwrap_or_else(|| layer.layer.clone());
                if !names.insert(display_name.clone()) {
                    return Err(CommandError::InvalidManifest(format!("layer name '{display_name}' is used more than once")))
                }
                descriptors.push(LayerSourceDescriptor {
                    container_path: container_path.clone(),
                    layer_identifier: layer.layer.clone(),
                    display_color: layer.color.rgba(),
                    display_name
                });
            }
        }

        Ok(Self {
            data_dir,
            containers,
            descriptors
        })
    }

    pub(crate) fn builtin<AsPath: AsRef<Path>>(data_dir: AsPath) -> Result<Self,CommandError> {
        Self::from_sources(Self::default_sources(), data_dir)
    }

    pub(crate) fn from_json<Reader: Read, AsPath: AsRef<Path>>(source: BufReader<Reader>, data_dir: AsPath) -> Result<Self,CommandError> {
        let containers = serde_json::from_reader::<_,Vec<ContainerSource>>(source).map_err(|e| CommandError::InvalidManifest(format!("{e}")))?;
        Self::from_sources(containers, data_dir)
    }

    pub(crate) fn from_file<AsPath: AsRef<Path>, DataPath: AsRef<Path>>(file: AsPath, data_dir: DataPath) -> Result<Self,CommandError> {
        let manifest = File::open(&file).map_err(|e| CommandError::ManifestRead(format!("{}: {e}",file.as_ref().display())))?;
        Self::from_json(BufReader::new(manifest), data_dir)
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn containers(&self) -> &[ContainerSource] {
        &self.containers
    }

    pub(crate) fn descriptors(&self) -> &[LayerSourceDescriptor] {
        &self.descriptors
    }

    pub(crate) fn descriptor(&self, display_name: &str) -> Option<&LayerSourceDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.display_name == display_name)
    }

    /// A missing container isn't fatal, its layers just won't load. Returns the paths that were missing.
    pub(crate) fn warn_missing_containers<Progress: ProgressObserver>(&self, progress: &mut Progress) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for container in &self.containers {
            let path = self.data_dir.join(&container.path);
            if !path.exists() {
                progress.warning(|| format!("GeoPackage not found: {}",path.display()));
                missing.push(path);
            }
        }
        missing
    }

}
