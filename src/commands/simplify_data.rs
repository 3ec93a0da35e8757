use std::path::Path;
use std::path::PathBuf;

use clap::Args;

use super::ManifestArg;
use super::Task;
use crate::algorithms::simplify::Tolerance;
use crate::algorithms::simplify::simplify;
use crate::errors::CommandError;
use crate::export::ContainerWriter;
use crate::layers::manifest::ContainerSource;
use crate::progress::ProgressObserver;
use crate::subcommand_def;
use crate::upload::loader::list_layers;
use crate::upload::loader::load_native;

subcommand_def!{
    /// Writes pre-simplified copies of the base layer GeoPackages, so the map has less to load
    pub(crate) struct SimplifyData {

        #[clap(flatten)]
        manifest_arg: ManifestArg,

        #[arg(long,default_value="custom_repository/data_simplified")]
        /// The folder to write the simplified GeoPackages to
        output_dir: PathBuf,

        #[arg(long)]
        /// Use this tolerance for every container instead of the ones in the manifest, in the containers' own units
        tolerance: Option<f64>,

    }
}

/// What happened to one container.
#[derive(Debug,Default,PartialEq)]
pub(crate) struct ContainerReport {
    pub(crate) written: Vec<String>,
    pub(crate) failed: Vec<String>,
    pub(crate) size_bytes: u64
}

impl ContainerReport {

    pub(crate) fn size_megabytes(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Copies every layer in the container, not just the ones the manifest lists, simplified but not reprojected.
/// A layer that fails is left out and the rest carry on.
pub(crate) fn simplify_container<Progress: ProgressObserver>(source: &Path, target: &Path, tolerance: &Tolerance, progress: &mut Progress) -> Result<ContainerReport,CommandError> {
    let layers = list_layers(source)?;
    let mut report = ContainerReport::default();

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = ContainerWriter::create(target)?;

    for layer in layers {
        progress.message(|| format!("Simplifying {layer}."));
        let result = load_native(source, &layer, progress).and_then(|collection| {
            let collection = simplify(collection, tolerance, progress);
            writer.write_layer(&layer, &collection, progress)
        });
        match result {
            Ok(()) => report.written.push(layer),
            Err(err) => {
                progress.warning(|| format!("{layer}: {err}"));
                report.failed.push(layer)
            }
        }
    }

    writer.close()?;
    report.size_bytes = std::fs::metadata(target)?.len();
    Ok(report)
}

impl SimplifyData {

    fn tolerance_for(&self, container: &ContainerSource) -> Tolerance {
        self.tolerance.or(container.simplify_tolerance).map_or_else(Tolerance::default, Tolerance::Fixed)
    }
}

impl Task for SimplifyData {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {

        let manifest = self.manifest_arg.load()?;

        for container in manifest.containers() {
            let source = manifest.data_dir().join(&container.path);
            if !source.exists() {
                progress.warning(|| format!("{} not found",source.display()));
                continue;
            }

            progress.announce(&format!("Processing {}",container.path.display()));
            let target = self.output_dir.join(&container.path);
            match simplify_container(&source, &target, &self.tolerance_for(container), progress) {
                Ok(report) => {
                    progress.message(|| format!("{} layers written, {} failed. Size: {:.2} MB",report.written.len(),report.failed.len(),report.size_megabytes()));
                },
                Err(err) => progress.warning(|| format!("{}: {err}",source.display()))
            }
        }

        Ok(())

    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::simplify_container;
    use super::SimplifyData;
    use super::ManifestArg;
    use crate::algorithms::simplify::Tolerance;
    use crate::layers::manifest::BaseManifest;
    use crate::upload::loader::list_layers;
    use crate::upload::loader::load_native;
    use crate::upload::loader::test::square;
    use crate::upload::loader::test::write_fixture;

    #[test]
    fn test_every_layer_is_copied() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Special_Category_Land.gpkg");
        write_fixture(&source, "GPKG", &[
            ("conservation_areas",Some(27700),&[("old town",square(450_000.0, 200_000.0, 800.0))]),
            ("open_greenspace",Some(27700),&[("park",square(451_000.0, 201_000.0, 200.0)),("green",square(452_000.0, 202_000.0, 50.0))]),
        ]);
        let target = dir.path().join("simplified").join("Special_Category_Land.gpkg");

        let report = simplify_container(&source, &target, &Tolerance::Fixed(1.0), &mut ()).unwrap();
        assert_eq!(report.written,vec!["conservation_areas".to_owned(),"open_greenspace".to_owned()]);
        assert!(report.failed.is_empty());
        assert!(report.size_bytes > 0);

        assert_eq!(list_layers(&target).unwrap(),report.written);
        let copied = load_native(&target, "open_greenspace", &mut ()).unwrap();
        assert_eq!(copied.len(),2);
        // still in metres
        assert!(copied.bounding_box().unwrap().min_x > 400_000.0);
    }

    #[test]
    fn test_tolerance_override() {
        let command = SimplifyData {
            manifest_arg: ManifestArg {
                data_dir: PathBuf::from("data"),
                manifest: None
            },
            output_dir: PathBuf::from("out"),
            tolerance: None
        };
        let manifest = BaseManifest::builtin("data").unwrap();
        assert_eq!(command.tolerance_for(&manifest.containers()[0]),Tolerance::Fixed(0.0005));
        assert_eq!(command.tolerance_for(&manifest.containers()[1]),Tolerance::Fixed(0.003));

        let command = SimplifyData {
            tolerance: Some(0.01),
            ..command
        };
        assert_eq!(command.tolerance_for(&manifest.containers()[0]),Tolerance::Fixed(0.01));
    }

    #[test]
    fn test_simplify_in_place_keeps_the_layers() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Environmental_Designations.gpkg");
        write_fixture(&source, "GPKG", &[
            ("sssi",Some(27700),&[("heath",square(480_000.0, 150_000.0, 900.0))]),
            ("spa",Some(27700),&[("marsh",square(481_000.0, 151_000.0, 300.0))]),
        ]);

        let report = simplify_container(&source, &source, &Tolerance::Fixed(1.0), &mut ()).unwrap();
        assert_eq!(report.written,vec!["sssi".to_owned(),"spa".to_owned()]);
        assert!(report.failed.is_empty());

        assert_eq!(list_layers(&source).unwrap(),report.written);
        assert_eq!(load_native(&source, "sssi", &mut ()).unwrap().len(),1);
        assert_eq!(load_native(&source, "spa", &mut ()).unwrap().len(),1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(),1);
    }
}
