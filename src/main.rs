#[macro_use]
extern crate clap;

use std::env;
use std::io;
use std::process;

use tokio::runtime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rusoto_core::Region;

use clap::{App, Arg, ArgMatches};

mod cache_policy;
mod deploy;
mod error;
mod key_resolver;
#[cfg(test)]
mod memory_store;
mod plan;
mod store;

use cache_policy::CachePolicy;
use deploy::{Deploy, DeployExecutor, Outcome};
use error::Error;

fn app() -> App<'static, 'static> {
    App::new("frontdeploy")
        .about("Deploy a frontend build from the staging bucket to production")
        .arg(
            Arg::with_name("source")
                .long("source")
                .value_name("BUCKET")
                .help("Sets the source S3 bucket")
                .takes_value(true)
                .default_value("lsdev-frontend"),
        )
        .arg(
            Arg::with_name("frontend")
                .long("frontend")
                .value_name("NAME")
                .help("Sets the frontend project")
                .takes_value(true)
                .default_value("lightspark-app"),
        )
        .arg(
            Arg::with_name("destination")
                .long("destination")
                .value_name("BUCKET")
                .help("Sets the destination S3 bucket")
                .takes_value(true)
                .default_value("lightspark-prod-web"),
        )
        .arg(
            Arg::with_name("check")
                .long("check")
                .help("Just checks that the specified version exists"),
        )
        .arg(
            Arg::with_name("min_files")
                .long("min-files")
                .value_name("NUM")
                .help("Sets the minimum number of files which should be present")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("max_age_static")
                .long("max-age-static")
                .value_name("SECS")
                .help("Sets the Cache-Control max-age for files in static/ and _next/")
                .takes_value(true)
                .default_value("2592000"),
        )
        .arg(
            Arg::with_name("s_maxage_root")
                .long("s-maxage-root")
                .value_name("SECS")
                .help("Sets the Cache-Control s-maxage for all other files")
                .takes_value(true)
                .default_value("15"),
        )
        .arg(
            Arg::with_name("strip_extension")
                .long("strip-extension")
                .help("Strips the .html extension from file names"),
        )
        .arg(
            Arg::with_name("VERSION")
                .help("Sets the frontend Git hash to deploy")
                .required(true)
                .index(1),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = app().get_matches();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let request = build_deploy(matches)?;

    let aws_region = if let Ok(endpoint) = env::var("S3_ENDPOINT") {
        let region = Region::Custom {
            name: Region::default().name().to_owned(),
            endpoint,
        };
        info!("picked up non-standard endpoint {:?} from S3_ENDPOINT env. variable", region);
        region
    } else {
        Region::default()
    };

    let rt = runtime::Builder::new_current_thread().enable_all().build()?;

    let outcome = rt.block_on(async {
        let s3_client = rusoto_s3::S3Client::new(aws_region);
        let executor = DeployExecutor::new(store::S3Store::new(s3_client));
        executor.execute(&request).await
    })?;
    match outcome {
        Outcome::Checked { files } => {
            info!("Version {} is present with {} files", request.version, files)
        }
        Outcome::Synced { copied, skipped } => {
            info!("Deployed {}: {} copied, {} unchanged", request.version, copied, skipped)
        }
    }
    Ok(())
}

fn build_deploy(matches: &ArgMatches) -> Result<Deploy, Error> {
    let version = matches
        .value_of("VERSION")
        .ok_or(Error::MissingField("version"))?
        .to_string();
    let min_files = value_t!(matches, "min_files", usize)?;
    let max_age_static = value_t!(matches, "max_age_static", u64)?;
    let s_maxage_root = value_t!(matches, "s_maxage_root", u64)?;

    Ok(Deploy {
        source_bucket: matches.value_of("source").unwrap_or_default().to_string(),
        destination_bucket: matches.value_of("destination").unwrap_or_default().to_string(),
        frontend: matches.value_of("frontend").unwrap_or_default().to_string(),
        version,
        check_only: matches.is_present("check"),
        min_files,
        cache_policy: CachePolicy {
            max_age_static,
            s_maxage_root,
        },
        strip_extension: matches.is_present("strip_extension"),
    })
}
