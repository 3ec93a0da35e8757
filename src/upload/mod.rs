/*!
Turning an uploaded file into a geometry collection: the archive is unpacked into scoped temporary
storage, then the primary file is read and reprojected.
*/

pub(crate) mod archive;
pub(crate) mod loader;
