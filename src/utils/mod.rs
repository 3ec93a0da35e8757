pub(crate) mod extent;
