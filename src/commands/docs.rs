use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use clap_markdown::help_markdown;
use schemars::schema_for;
use schemars::JsonSchema;
use serde::Serialize;

use super::LandConstraintChecker;
use super::Task;
use crate::errors::CommandError;
use crate::layers::manifest::BaseManifest;
use crate::layers::manifest::ContainerSource;
use crate::progress::ProgressObserver;
use crate::subcommand_def;

fn write_command_help(target: PathBuf) -> Result<(),CommandError> {
    let mut target = File::create(target)?;
    write!(&mut target,"{}",help_markdown::<LandConstraintChecker>())?;
    Ok(())
}

fn write_schema<Schema: JsonSchema>(target: PathBuf) -> Result<(),CommandError> {
    let mut target = File::create(target)?;
    let schema = schema_for!(Schema);
    write!(&mut target,"{}",serde_json::to_string_pretty(&schema)?)?;
    Ok(())
}

fn write_json<Data: Serialize>(data: &Data, target: PathBuf) -> Result<(),CommandError> {
    let mut target = File::create(target)?;
    write!(&mut target,"{}",serde_json::to_string_pretty(data)?)?;
    Ok(())
}

subcommand_def!{
    /// Writes generatable documentation and json schemas to a folder.
    #[command(hide=true)]
    pub(crate) struct Docs {

        #[arg(long)]
        /// The folder to output the generated documentation to
        docs: PathBuf,

        #[arg(long)]
        /// The folder to output generated schemas to
        schemas: PathBuf

    }
}

impl Task for Docs {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        std::fs::create_dir_all(&self.docs)?;
        std::fs::create_dir_all(&self.schemas)?;

        write_command_help(self.docs.join("Commands.md"))?;
        write_schema::<Vec<ContainerSource>>(self.schemas.join("base_manifest.schema.json"))?;
        // the built-in list, as a starting point for a custom manifest
        write_json(&BaseManifest::default_sources(), self.docs.join("base_manifest.json"))?;

        progress.message(|| format!("Documentation written to {} and {}.",self.docs.display(),self.schemas.display()));
        Ok(())
    }
}
