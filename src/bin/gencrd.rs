use kube::CustomResourceExt;
use operator::{
    Error,
    duck::{self, v1::Conditions},
    scheme,
    serving::{
        self,
        v1alpha1::{DomainMapping, DomainMappingSpec},
    },
    telemetry,
};
use tracing::*;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    // Output directory
    #[arg(short, long, default_value = ".")]
    output: String,
    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    format: Format,
}

fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();
    let scheme = scheme::install(serving::scheme()?)?;

    // Refuse to publish a kind the generic status machinery cannot handle
    duck::verify_type::<Conditions, _>(&DomainMapping::new(
        "example.com",
        DomainMappingSpec::default(),
    ))?;

    // Create directory if it does not exist
    std::fs::create_dir_all(&args.output)?;
    let gvk = scheme.kind_for::<DomainMapping>();
    let crd = DomainMapping::crd();
    let (ext, body) = match args.format {
        Format::Yaml => ("yaml", serde_yaml::to_string(&crd)?),
        Format::Json => (
            "json",
            serde_json::to_string_pretty(&crd).map_err(Error::SerializationError)?,
        ),
    };
    let path = format!("{}/{}.{}", args.output, gvk.kind.to_lowercase(), ext);
    std::fs::write(&path, body)?;
    info!("Wrote {} CRD to {}", gvk.kind, path);
    Ok(())
}
