pub(crate) mod simplify;
pub(crate) mod view;
