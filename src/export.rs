use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use gdal::Dataset;
use gdal::DriverManager;
use gdal::LayerOptions;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::FieldValue;
use gdal::vector::LayerAccess as _;
use gdal::vector::OGRFieldType;
use gdal::vector::OGRwkbGeometryType;
use gdal::vector::ToGdal as _;
use tempfile::Builder as TempBuilder;
use tempfile::TempDir;

use crate::errors::CommandError;
use crate::geometry::AttributeValue;
use crate::geometry::Crs;
use crate::geometry::GeometryCollection;
use crate::geometry::canonical_spatial_ref;
use crate::progress::ProgressObserver;
use crate::progress::WatchableIterator as _;

/// A GeoPackage being written from scratch. Layers go to a staging file next to the target, which only
/// replaces the target on `close`. Until then any existing file at the target, which may be the very file
/// the layers are being read from, is left alone.
pub(crate) struct ContainerWriter {
    dataset: Dataset,
    // deleted along with the staging file if the writer is dropped without closing
    staging: TempDir,
    staging_path: PathBuf,
    target: PathBuf
}

impl ContainerWriter {

    const GDAL_DRIVER: &'static str = "GPKG";

    pub(crate) fn create<FilePath: AsRef<Path>>(path: FilePath) -> Result<Self,CommandError> {
        let target = path.as_ref().to_path_buf();
        let parent = target.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        // same directory, so the final rename never crosses file systems
        let staging = TempBuilder::new().prefix(".staging-").tempdir_in(parent)?;
        let staging_path = staging.path().join(target.file_name().unwrap_or_else(|| OsStr::new("container.gpkg")));
        let driver = DriverManager::get_driver_by_name(Self::GDAL_DRIVER)?;
        let dataset = driver.create_vector_only(&staging_path)?;
        Ok(Self {
            dataset,
            staging,
            staging_path,
            target
        })
    }

    /// Writes the collection as a new layer, in whatever CRS the collection is in. Either the whole layer is written or none of it.
    pub(crate) fn write_layer<Progress: ProgressObserver>(&mut self, name: &str, collection: &GeometryCollection, progress: &mut Progress) -> Result<(),CommandError> {

        let srs = match collection.crs() {
            Crs::Canonical => canonical_spatial_ref()?,
            Crs::Source(wkt) => SpatialRef::from_wkt(wkt)?
        };

        let field_defs: Vec<(&str,OGRFieldType::Type)> = collection.fields().iter().map(|field| (field.name.as_str(),field.kind.to_gdal())).collect();

        let mut transaction = self.dataset.start_transaction()?;
        {
            let mut layer = transaction.create_layer(LayerOptions {
                name,
                srs: Some(&srs),
                ty: OGRwkbGeometryType::wkbUnknown,
                ..Default::default()
            })?;
            layer.create_defn_fields(&field_defs)?;

            for feature in collection.features().iter().watch(progress, format!("Writing {name}."), format!("{name} written.")) {
                let mut field_names = Vec::new();
                let mut field_values = Vec::new();
                for (field,value) in &feature.attributes {
                    let value = match value {
                        AttributeValue::Integer(value) => FieldValue::Integer64Value(*value),
                        AttributeValue::Real(value) => FieldValue::RealValue(*value),
                        AttributeValue::Text(value) => FieldValue::StringValue(value.clone()),
                        // unset is null
                        AttributeValue::Null => continue
                    };
                    field_names.push(field.as_str());
                    field_values.push(value);
                }
                layer.create_feature_fields(feature.geometry.to_gdal()?, &field_names, &field_values)?;
            }
        }
        transaction.commit()?;
        Ok(())
    }

    /// Closes the file and moves it over the target, replacing whatever was there.
    pub(crate) fn close(mut self) -> Result<(),CommandError> {
        self.dataset.flush_cache()?;
        drop(self.dataset);
        std::fs::rename(&self.staging_path, &self.target)?;
        self.staging.close()?;
        Ok(())
    }
}
