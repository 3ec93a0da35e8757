use std::ffi::OsStr;
use std::io::Cursor;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use tempfile::Builder as TempBuilder;
use tempfile::NamedTempFile;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::errors::CommandError;
use crate::progress::ProgressObserver;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub(crate) enum UploadFormat {
    ZippedShapefile,
    GeoPackage,
    Shapefile
}

impl UploadFormat {

    pub(crate) fn from_filename(filename: &str) -> Result<Self,CommandError> {
        let extension = Path::new(filename).extension().and_then(OsStr::to_str).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("zip") => Ok(Self::ZippedShapefile),
            Some("gpkg") => Ok(Self::GeoPackage),
            Some("shp") => Ok(Self::Shapefile),
            Some(_) | None => Err(CommandError::UnsupportedFormat(filename.to_owned()))
        }
    }

    pub(crate) const fn is_container(self) -> bool {
        matches!(self,Self::GeoPackage)
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::ZippedShapefile => ".zip",
            Self::GeoPackage => ".gpkg",
            Self::Shapefile => ".shp",
        }
    }
}

// The guard is never read, it only exists to delete the files when dropped.
enum TempResource {
    Directory(TempDir),
    File(NamedTempFile)
}

/// An upload written out to temporary storage. The files (including any shapefile companions next to
/// the primary file) live exactly as long as this value.
pub(crate) struct ExtractedUpload {
    _resource: TempResource,
    path: PathBuf,
    format: UploadFormat,
    filename: String
}

impl ExtractedUpload {

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) const fn format(&self) -> UploadFormat {
        self.format
    }

    /// The name the user uploaded the file under.
    pub(crate) fn filename(&self) -> &str {
        &self.filename
    }
}

pub(crate) fn extract_primary_geometry_file<Progress: ProgressObserver>(upload: &[u8], filename: &str, progress: &mut Progress) -> Result<ExtractedUpload,CommandError> {
    extract_primary_geometry_file_in(upload, filename, &std::env::temp_dir(), progress)
}

/// Like `extract_primary_geometry_file`, with the temporary files created under `temp_root`.
pub(crate) fn extract_primary_geometry_file_in<Progress: ProgressObserver>(upload: &[u8], filename: &str, temp_root: &Path, progress: &mut Progress) -> Result<ExtractedUpload,CommandError> {

    let format = UploadFormat::from_filename(filename)?;

    match format {
        UploadFormat::ZippedShapefile => {
            let directory = TempBuilder::new().prefix("upload-").tempdir_in(temp_root)?;
            // if anything fails from here on, the directory is dropped and deleted along with it.
            let mut archive = ZipArchive::new(Cursor::new(upload))?;
            archive.extract(directory.path())?;
            let path = find_first_with_extension(directory.path(), "shp")?.ok_or(CommandError::NoGeometryFileFound)?;
            Ok(ExtractedUpload {
                _resource: TempResource::Directory(directory),
                path,
                format,
                filename: filename.to_owned()
            })
        },
        UploadFormat::Shapefile => {
            progress.warning(|| "Standalone .shp file detected. This may not work without .shx, .dbf, and .prj files.");
            progress.warning(|| "Tip: Zip all shapefile components (.shp, .shx, .dbf, .prj) together and upload the zip file for best results.");
            write_scoped_file(upload, filename, format, temp_root)
        },
        UploadFormat::GeoPackage => write_scoped_file(upload, filename, format, temp_root)
    }

}

fn write_scoped_file(upload: &[u8], filename: &str, format: UploadFormat, temp_root: &Path) -> Result<ExtractedUpload,CommandError> {
    // GDAL picks the driver from the extension, so the suffix has to survive.
    let mut file = TempBuilder::new().prefix("upload-").suffix(format.suffix()).tempfile_in(temp_root)?;
    file.write_all(upload)?;
    file.flush()?;
    let path = file.path().to_path_buf();
    Ok(ExtractedUpload {
        _resource: TempResource::File(file),
        path,
        format,
        filename: filename.to_owned()
    })
}

/// Entries are visited in file name order so that the "first" file is the same on every platform.
fn find_first_with_extension(root: &Path, extension: &str) -> Result<Option<PathBuf>,CommandError> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().and_then(OsStr::to_str).is_some_and(|found| found.eq_ignore_ascii_case(extension)) {
            return Ok(Some(entry.into_path()))
        }
    }
    Ok(None)
}
