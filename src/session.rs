/*!
Everything one user sees on the map: the base layers they've turned on, the boundaries they've uploaded, and
where the map is looking. Uploads, layer selections and zoom actions all go through a [`Session`].
*/

use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

use crate::algorithms::simplify::Tolerance;
use crate::algorithms::simplify::simplify;
use crate::algorithms::view::ViewDescriptor;
use crate::algorithms::view::ZoomTable;
use crate::algorithms::view::compute_view;
use crate::errors::CommandError;
use crate::geometry::GeometryCollection;
use crate::layers::Layer;
use crate::layers::LayerCategory;
use crate::layers::LayerRegistry;
use crate::layers::LayerVisibility;
use crate::layers::USER_FILL_COLOR;
use crate::layers::cache::KeyedCache;
use crate::layers::manifest::BaseManifest;
use crate::layers::manifest::LayerSourceDescriptor;
use crate::progress::ProgressObserver;
use crate::render::RenderPayload;
use crate::upload::archive::ExtractedUpload;
use crate::upload::archive::extract_primary_geometry_file;
use crate::upload::loader::list_layers;
use crate::upload::loader::load;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub(crate) enum BaseLoadMode {
    /// Load every base layer while the session starts.
    Eager,
    /// Load a base layer the first time it's shown.
    OnDemand
}

#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) enum UploadOutcome {
    Loaded {
        name: String,
        feature_count: usize,
        /// False if a layer with this name was already uploaded, in which case nothing changed.
        added: bool
    },
    /// The upload holds several layers. Pick one and call [`Session::load_selected_layer`].
    LayerSelectionRequired {
        layers: Vec<String>
    }
}

type BaseKey = (PathBuf,String);

pub(crate) struct Session {
    manifest: BaseManifest,
    tolerance: Tolerance,
    zoom_table: ZoomTable,
    registry: LayerRegistry,
    base_cache: KeyedCache<BaseKey,GeometryCollection>,
    view: ViewDescriptor,
    // the container stays on disk until the user has picked all the layers they want from it
    pending: Option<ExtractedUpload>
}

impl Session {

    pub(crate) fn new<Progress: ProgressObserver>(manifest: BaseManifest, mode: BaseLoadMode, progress: &mut Progress) -> Self {
        Self::with_settings(manifest, mode, Tolerance::default(), ZoomTable::default(), progress)
    }

    pub(crate) fn with_settings<Progress: ProgressObserver>(manifest: BaseManifest, mode: BaseLoadMode, tolerance: Tolerance, zoom_table: ZoomTable, progress: &mut Progress) -> Self {
        let mut session = Self {
            manifest,
            tolerance,
            zoom_table,
            registry: LayerRegistry::default(),
            base_cache: KeyedCache::new(),
            view: ViewDescriptor::default(),
            pending: None
        };

        let missing = session.manifest.warn_missing_containers(progress);

        if let BaseLoadMode::Eager = mode {
            progress.announce("Loading base layers");
            let descriptors: Vec<LayerSourceDescriptor> = session.manifest.descriptors().iter().filter(|descriptor| !missing.contains(&descriptor.container_path)).cloned().collect();
            for descriptor in descriptors {
                if let Err(err) = session.load_base_layer(&descriptor, progress) {
                    progress.warning(|| format!("Error loading {}: {err}",descriptor.display_name))
                }
            }
            progress.message(|| format!("{} base layers loaded.",session.base_cache.len()));
        }

        session
    }

    pub(crate) const fn view(&self) -> &ViewDescriptor {
        &self.view
    }

    pub(crate) const fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub(crate) const fn manifest(&self) -> &BaseManifest {
        &self.manifest
    }

    fn load_base_layer<Progress: ProgressObserver>(&mut self, descriptor: &LayerSourceDescriptor, progress: &mut Progress) -> Result<(),CommandError> {
        if self.registry.contains(LayerCategory::Base, &descriptor.display_name) {
            return Ok(())
        }
        let tolerance = &self.tolerance;
        let key = (descriptor.container_path.clone(),descriptor.layer_identifier.clone());
        let geometry = self.base_cache.get_or_load(key, |(path,layer)| {
            let collection = load(path, Some(layer.as_str()), progress)?;
            Ok::<_,CommandError>(simplify(collection, tolerance, progress))
        })?;
        _ = self.registry.register(&descriptor.display_name, geometry, descriptor.display_color, LayerCategory::Base);
        Ok(())
    }

    /// Turns a base layer on, loading it first if it hasn't been already.
    pub(crate) fn show_base_layer<Progress: ProgressObserver>(&mut self, name: &str, visibility: &mut LayerVisibility, progress: &mut Progress) -> Result<(),CommandError> {
        let descriptor = self.manifest.descriptor(name).cloned().ok_or_else(|| CommandError::UnknownLayer(name.to_owned()))?;
        self.load_base_layer(&descriptor, progress)?;
        visibility.set(LayerCategory::Base, name, true);
        Ok(())
    }

    pub(crate) fn handle_upload<Progress: ProgressObserver>(&mut self, upload: &[u8], filename: &str, progress: &mut Progress) -> Result<UploadOutcome,CommandError> {
        let extracted = extract_primary_geometry_file(upload, filename, progress)?;
        if extracted.format().is_container() {
            let layers = list_layers(extracted.path())?;
            // replaces, and so cleans up, any earlier container nobody picked from
            self.pending = Some(extracted);
            return Ok(UploadOutcome::LayerSelectionRequired { layers })
        }
        self.load_user_layer(filename, extracted.path(), None, progress)
        // the extracted files are released here
    }

    /// Loads one layer from the last uploaded container.
    pub(crate) fn load_selected_layer<Progress: ProgressObserver>(&mut self, layer: &str, progress: &mut Progress) -> Result<UploadOutcome,CommandError> {
        let pending = self.pending.take().ok_or(CommandError::NoPendingContainer)?;
        let name = format!("{}-{layer}",pending.filename());
        let result = self.load_user_layer(&name, pending.path(), Some(layer), progress);
        self.pending = Some(pending);
        result
    }

    fn load_user_layer<Progress: ProgressObserver>(&mut self, name: &str, path: &Path, layer: Option<&str>, progress: &mut Progress) -> Result<UploadOutcome,CommandError> {
        if let Some(existing) = self.registry.get(LayerCategory::User, name) {
            progress.message(|| format!("{name} is already loaded."));
            return Ok(UploadOutcome::Loaded {
                name: name.to_owned(),
                feature_count: existing.geometry().len(),
                added: false
            })
        }

        let collection = load(path, layer, progress)?;
        let collection = Rc::new(simplify(collection, &self.tolerance, progress));
        let feature_count = collection.len();
        let added = self.registry.register(name, Rc::clone(&collection), USER_FILL_COLOR, LayerCategory::User);
        if added {
            progress.message(|| format!("{name} loaded successfully with {feature_count} features."));
            match compute_view([collection.as_ref()], &self.zoom_table) {
                Ok(view) => self.view = view,
                Err(CommandError::NoGeometry) => progress.warning(|| format!("{name} has no geometry to zoom to.")),
                Err(err) => return Err(err)
            }
        }

        Ok(UploadOutcome::Loaded {
            name: name.to_owned(),
            feature_count,
            added
        })
    }

    fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.registry.get(LayerCategory::User, name).or_else(|| self.registry.get(LayerCategory::Base, name))
    }

    /// Fits the view to one layer. If that can't be done, the view stays where it was.
    pub(crate) fn zoom_to_layer(&mut self, name: &str) -> Result<&ViewDescriptor,CommandError> {
        let layer = self.find_layer(name).ok_or_else(|| CommandError::UnknownLayer(name.to_owned()))?;
        self.view = compute_view([layer.geometry()], &self.zoom_table)?;
        Ok(&self.view)
    }

    fn visible_layers<'session>(&'session self, visibility: &'session LayerVisibility) -> impl Iterator<Item = &'session Layer> {
        self.registry.list(LayerCategory::Base).chain(self.registry.list(LayerCategory::User)).filter(|layer| visibility.is_visible(layer))
    }

    pub(crate) fn zoom_to_visible(&mut self, visibility: &LayerVisibility) -> Result<&ViewDescriptor,CommandError> {
        self.view = compute_view(self.visible_layers(visibility).map(Layer::geometry), &self.zoom_table)?;
        Ok(&self.view)
    }

    pub(crate) fn render_payload(&self, visibility: &LayerVisibility) -> RenderPayload {
        RenderPayload::new(self.view.clone(), self.visible_layers(visibility))
    }

}

#[cfg(test)]
mod test {
    use std::path::Path;

    use tempfile::TempDir;

    use super::BaseLoadMode;
    use super::Session;
    use super::UploadOutcome;
    use crate::algorithms::view::ViewDescriptor;
    use crate::errors::CommandError;
    use crate::layers::LayerCategory;
    use crate::layers::LayerVisibility;
    use crate::layers::manifest::BaseManifest;
    use crate::layers::manifest::ContainerSource;
    use crate::layers::manifest::LayerSource;
    use crate::layers::manifest::NamedColor;
    use crate::progress::test::WarningRecorder;
    use crate::upload::archive::test::zip_bytes;
    use crate::upload::loader::test::square;
    use crate::upload::loader::test::write_fixture;

    fn empty_session() -> Session {
        Session::new(BaseManifest::from_sources(Vec::new(), "data").unwrap(), BaseLoadMode::OnDemand, &mut ())
    }

    /// Zips up every file written for a shapefile in `dir`.
    fn zipped_shapefile(dir: &Path) -> Vec<u8> {
        let mut files: Vec<(String,Vec<u8>)> = std::fs::read_dir(dir).unwrap().map(|entry| {
            let path = entry.unwrap().path();
            (format!("parcel/{}",path.file_name().unwrap().to_str().unwrap()),std::fs::read(&path).unwrap())
        }).collect();
        files.sort();
        let entries: Vec<(&str,&[u8])> = files.iter().map(|(name,content)| (name.as_str(),content.as_slice())).collect();
        zip_bytes(&entries)
    }

    fn base_data(dir: &Path) -> BaseManifest {
        write_fixture(&dir.join("Environmental_Designations.gpkg"), "GPKG", &[
            ("sssi",Some(4326),&[("heath",square(-2.0, 51.0, 0.5))]),
            ("aonb",Some(4326),&[("hills",square(-4.0, 50.0, 2.0))]),
        ]);
        BaseManifest::from_sources(vec![
            ContainerSource {
                path: "Environmental_Designations.gpkg".into(),
                layers: vec![
                    LayerSource { layer: "sssi".to_owned(), color: NamedColor::CadetBlue, name: None },
                    LayerSource { layer: "aonb".to_owned(), color: NamedColor::Blue, name: Some("Areas of Outstanding Natural Beauty".to_owned()) },
                ],
                simplify_tolerance: None
            },
            ContainerSource {
                path: "Special_Category_Land.gpkg".into(),
                layers: vec![LayerSource { layer: "crow_act_2000".to_owned(), color: NamedColor::Black, name: None }],
                simplify_tolerance: None
            }
        ], dir).unwrap()
    }

    #[test]
    fn test_zip_without_shapefile_adds_nothing() {
        let mut session = empty_session();
        let upload = zip_bytes(&[("readme.txt",b"boundary to follow")]);
        let result = session.handle_upload(&upload, "boundary.zip", &mut ());
        assert!(matches!(result,Err(CommandError::NoGeometryFileFound)));
        assert_eq!(session.registry().len(LayerCategory::User),0);
        assert_eq!(session.view(),&ViewDescriptor::default());
    }

    #[test]
    fn test_zipped_shapefile_loads_and_recenters() {
        let source = TempDir::new().unwrap();
        write_fixture(&source.path().join("parcel.shp"), "ESRI Shapefile", &[("parcel",Some(4326),&[("field",square(-1.5, 52.5, 0.01))])]);
        let upload = zipped_shapefile(source.path());

        let mut session = empty_session();
        let outcome = session.handle_upload(&upload, "parcel.zip", &mut ()).unwrap();
        assert_eq!(outcome,UploadOutcome::Loaded { name: "parcel.zip".to_owned(), feature_count: 1, added: true });
        assert_eq!(session.view().zoom_level,13);
        assert!((session.view().center_longitude - -1.495).abs() < 1e-6);
        assert!((session.view().center_latitude - 52.505).abs() < 1e-6);

        // a second upload under the same name is ignored
        let outcome = session.handle_upload(&upload, "parcel.zip", &mut ()).unwrap();
        assert_eq!(outcome,UploadOutcome::Loaded { name: "parcel.zip".to_owned(), feature_count: 1, added: false });
        assert_eq!(session.registry().len(LayerCategory::User),1);
    }

    #[test]
    fn test_geopackage_waits_for_selection() {
        let source = TempDir::new().unwrap();
        let path = source.path().join("sites.gpkg");
        write_fixture(&path, "GPKG", &[
            ("parcels",Some(4326),&[("north",square(-1.0, 52.0, 0.2)),("south",square(-1.0, 51.0, 0.2))]),
            ("access",Some(4326),&[("lane",square(-1.1, 52.1, 0.01))]),
        ]);
        let upload = std::fs::read(&path).unwrap();

        let mut session = empty_session();
        assert!(matches!(session.load_selected_layer("parcels", &mut ()),Err(CommandError::NoPendingContainer)));

        let outcome = session.handle_upload(&upload, "sites.gpkg", &mut ()).unwrap();
        assert_eq!(outcome,UploadOutcome::LayerSelectionRequired { layers: vec!["parcels".to_owned(),"access".to_owned()] });
        assert_eq!(session.registry().len(LayerCategory::User),0);
        assert_eq!(session.view(),&ViewDescriptor::default());

        let outcome = session.load_selected_layer("parcels", &mut ()).unwrap();
        assert_eq!(outcome,UploadOutcome::Loaded { name: "sites.gpkg-parcels".to_owned(), feature_count: 2, added: true });
        // 0.2 wide, 1.2 tall
        assert_eq!(session.view().zoom_level,8);

        // the container is still there for another pick
        _ = session.load_selected_layer("access", &mut ()).unwrap();
        assert_eq!(session.registry().len(LayerCategory::User),2);
        assert!(matches!(session.load_selected_layer("nope", &mut ()),Err(CommandError::CorruptSource(_))));
    }

    #[test]
    fn test_on_demand_base_layers() {
        let data = TempDir::new().unwrap();
        let mut progress = WarningRecorder::default();
        let mut session = Session::new(base_data(data.path()), BaseLoadMode::OnDemand, &mut progress);
        assert!(progress.warned_about("Special_Category_Land.gpkg"));
        assert_eq!(session.registry().len(LayerCategory::Base),0);

        let mut visibility = LayerVisibility::default();
        session.show_base_layer("sssi", &mut visibility, &mut ()).unwrap();
        session.show_base_layer("sssi", &mut visibility, &mut ()).unwrap();
        assert_eq!(session.registry().len(LayerCategory::Base),1);
        assert_eq!(session.base_cache.len(),1);

        let sssi = session.registry().get(LayerCategory::Base, "sssi").unwrap();
        assert!(visibility.is_visible(sssi));
        assert_eq!(sssi.fill_color(),[95,158,160,140]);

        assert!(matches!(session.show_base_layer("crow_act_2000", &mut visibility, &mut ()),Err(CommandError::FileNotFound(_))));
        assert!(matches!(session.show_base_layer("nope", &mut visibility, &mut ()),Err(CommandError::UnknownLayer(_))));
        assert_eq!(session.registry().len(LayerCategory::Base),1);
    }

    #[test]
    fn test_eager_base_layers_start_hidden() {
        let data = TempDir::new().unwrap();
        let session = Session::new(base_data(data.path()), BaseLoadMode::Eager, &mut ());
        let names: Vec<&str> = session.registry().list(LayerCategory::Base).map(|layer| layer.name()).collect();
        assert_eq!(names,vec!["sssi","Areas of Outstanding Natural Beauty"]);

        let visibility = LayerVisibility::default();
        assert!(session.render_payload(&visibility).layers.is_empty());
    }

    #[test]
    fn test_zoom_actions() {
        let data = TempDir::new().unwrap();
        let mut session = Session::new(base_data(data.path()), BaseLoadMode::Eager, &mut ());
        let mut visibility = LayerVisibility::default();

        // nothing visible yet
        assert!(matches!(session.zoom_to_visible(&visibility),Err(CommandError::NoGeometry)));
        assert_eq!(session.view(),&ViewDescriptor::default());

        let view = session.zoom_to_layer("sssi").unwrap();
        assert_eq!(view.zoom_level,11);

        visibility.set(LayerCategory::Base, "sssi", true);
        visibility.set(LayerCategory::Base, "Areas of Outstanding Natural Beauty", true);
        // -4..-1.5 by 50..52
        let view = session.zoom_to_visible(&visibility).unwrap().clone();
        assert_eq!(view.zoom_level,7);
        assert!((view.center_longitude - -2.75).abs() < 1e-9);

        assert!(matches!(session.zoom_to_layer("nope"),Err(CommandError::UnknownLayer(_))));
        assert_eq!(session.view(),&view);

        let payload = session.render_payload(&visibility);
        assert_eq!(payload.layers.len(),2);
        assert_eq!(payload.view,view);
    }
}
