use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::errors::CommandError;
use crate::layers::manifest::BaseManifest;
use crate::progress::ProgressObserver;

mod view;
mod layers;
mod simplify_data;
mod docs;

use view::View;
use layers::Layers;
use simplify_data::SimplifyData;
use docs::Docs;

pub(crate) trait Task {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError>;

}

#[macro_export]
macro_rules! command_def {
    ($struct_name: ident {$($command_name: ident),*}) => {

        #[derive(Subcommand)]
        pub(crate) enum $struct_name {
            $(
                $command_name($command_name)
            ),*
        }

        impl Task for $struct_name {

            fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
                match self {
                    $(Self::$command_name(a) => a.run(progress)),*
                }
            }

        }
    };
}

#[macro_export]
macro_rules! subcommand_def {
    ($(#[$attr: meta])* $visibility: vis struct $struct_name: ident $body: tt) => {
        #[derive(Args)]
        $(#[$attr])*
        $visibility struct $struct_name $body
    };
}

command_def!{
    MainCommand {
        View,
        Layers,
        SimplifyData,
        Docs
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Shows constraint layers (environmental designations, special category land, sensitive infrastructure) against an uploaded site boundary.
pub(crate) struct LandConstraintChecker {
    #[command(subcommand)]
    command: MainCommand
}

impl Task for LandConstraintChecker {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        self.command.run(progress)
    }
}

#[derive(Args)]
pub(crate) struct ManifestArg {

    #[arg(long,default_value=BaseManifest::DEFAULT_DATA_DIR)]
    /// The folder the base layer GeoPackages are in
    pub(crate) data_dir: PathBuf,

    #[arg(long)]
    /// A JSON file listing the base layers. If not given, the standard designations are used.
    pub(crate) manifest: Option<PathBuf>,

}

impl ManifestArg {

    pub(crate) fn load(&self) -> Result<BaseManifest,CommandError> {
        match &self.manifest {
            Some(manifest) => BaseManifest::from_file(manifest, &self.data_dir),
            None => BaseManifest::builtin(&self.data_dir)
        }
    }
}
