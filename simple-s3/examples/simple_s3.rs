use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::Context as _, Result};
use simple_s3::{Credentials, ObjectRef, Options, SimpleS3};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    run(args).await
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, env = "AWS_ACCESS_KEY_ID")]
    access_key: String,
    #[clap(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_key: String,
    #[clap(long, env = "AWS_REGION")]
    region: String,
    /// Bucket for objects given without an `s3://<bucket>/` prefix
    #[clap(long)]
    default_bucket: Option<String>,
    /// Use an s3 compatible service instead of aws, e.g. http://localhost:9000
    #[clap(long)]
    endpoint_url: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file
    UploadPath {
        path: Utf8PathBuf,
        /// `s3://<bucket>/<key>` or just `<key>`
        object: ObjectRef,
    },
    /// Fetch a url and upload the response
    UploadUrl {
        url: String,
        object: ObjectRef,
        /// Save the response here first, then upload the file
        #[clap(long)]
        local_path: Option<Utf8PathBuf>,
    },
    /// Download an object to a local file
    Download { object: ObjectRef, path: Utf8PathBuf },
    /// List the objects of a bucket (first page only)
    List { bucket: Option<String> },
}

async fn run(args: Args) -> Result<()> {
    let s3 = SimpleS3::new(
        Credentials::new(args.access_key, args.secret_key, args.region),
        Options::builder()
            .maybe_default_bucket(args.default_bucket)
            .maybe_endpoint_url(args.endpoint_url.clone())
            .force_path_style(args.endpoint_url.is_some())
            .build(),
    )
    .wrap_err("failed to initialize client")?;

    match args.command {
        Command::UploadPath { path, object } => {
            let ack = s3
                .upload_from_path()
                .path(&path)
                .key(&object.key)
                .maybe_bucket(object.bucket())
                .call()
                .await
                .wrap_err_with(|| format!("failed to upload {path} to {object}"))?;
            info!(e_tag = ?ack.e_tag(), "uploaded {path} to {object}");
        }
        Command::UploadUrl {
            url,
            object,
            local_path,
        } => {
            let ack = s3
                .upload_from_url()
                .url(&url)
                .key(&object.key)
                .maybe_local_path(local_path.as_deref())
                .maybe_bucket(object.bucket())
                .call()
                .await
                .wrap_err_with(|| format!("failed to upload {url} to {object}"))?;
            info!(e_tag = ?ack.e_tag(), "uploaded {url} to {object}");
        }
        Command::Download { object, path } => {
            let len = s3
                .download_to()
                .key(&object.key)
                .path(&path)
                .maybe_bucket(object.bucket())
                .call()
                .await
                .wrap_err_with(|| format!("failed to download {object}"))?;
            info!("downloaded {len} bytes from {object} to {path}");
        }
        Command::List { bucket } => {
            let objs = s3
                .list_files(bucket.as_deref())
                .await
                .wrap_err("failed to list objects")?;
            for obj in objs {
                println!(
                    "{}\t{}",
                    obj.size().unwrap_or_default(),
                    obj.key().unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
