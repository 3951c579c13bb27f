//! mesh-install - control-plane installer CLI
//!
//! Translates an installation spec into chart values, renders and patches
//! component manifests, and applies them in dependency order.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use mesh_installer::api::{default_mappings, ControlPlaneSpec};
use mesh_installer::config::InstallerConfig;
use mesh_installer::installer::{
    read_manifests, write_manifests, Applier, ComponentOutcome, DryRunApplier, InstallSession,
    KubectlApplier,
};
use mesh_installer::manifest::parse_objects;
use mesh_installer::overlay::{patch, K8sObjectOverlay};
use mesh_installer::render::{generate_manifests, DirectoryRenderer};
use mesh_installer::translate::UnmappedPolicy;
use mesh_installer::value::{to_yaml, Value};

#[derive(Debug, Parser)]
#[command(name = "mesh-install", version, about = "Control-plane installer")]
struct Cli {
    /// Installer configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Output location. Use '-' for stdout.
    #[arg(short, long, global = true, default_value = "-")]
    output: String,
    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the chart values translated from a spec.
    Values {
        spec: PathBuf,
        /// Copy untranslated fields to the same path instead of dropping them.
        #[arg(long)]
        mirror: bool,
    },
    /// Render the manifests of every enabled component.
    Manifest {
        spec: PathBuf,
        /// Directory holding `{component}/{component}.yaml` templates.
        #[arg(long)]
        charts: PathBuf,
        /// Write one file per component below this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Apply overlays to a multi-document manifest.
    Patch {
        manifest: PathBuf,
        /// YAML list of overlays.
        #[arg(long)]
        overlays: PathBuf,
        /// Namespace of objects that do not name one.
        #[arg(long, default_value = "istio-system")]
        namespace: String,
    },
    /// Apply a manifest directory in dependency order.
    Apply {
        /// Directory holding `{component}/{component}.yaml` manifests.
        manifests: PathBuf,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        kubectl: Option<PathBuf>,
        /// Log instead of applying.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = runtime.block_on(run(cli)) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => InstallerConfig::from_file(path)?,
        None => InstallerConfig::default(),
    };

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::Values { spec, mirror } => values(&spec, mirror, &mut output),
        Command::Manifest {
            spec,
            charts,
            output_dir,
        } => manifest(&spec, &charts, output_dir.as_deref(), &mut output),
        Command::Patch {
            manifest,
            overlays,
            namespace,
        } => patch_manifest(&manifest, &overlays, &namespace, &mut output),
        Command::Apply {
            manifests,
            namespace,
            kubectl,
            dry_run,
        } => {
            if let Some(namespace) = namespace {
                config.namespace = namespace;
            }
            if let Some(kubectl) = kubectl {
                config.kubectl = kubectl;
            }
            apply(&config, &manifests, dry_run, &mut output).await
        }
    }
}

fn read_spec(path: &Path) -> Result<ControlPlaneSpec, Box<dyn std::error::Error>> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read spec {:?}: {}", path, e))?;
    Ok(ControlPlaneSpec::from_yaml(&content)
        .map_err(|e| format!("Failed to parse spec {:?}: {}", path, e))?)
}

fn values(
    spec: &Path,
    mirror: bool,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = read_spec(spec)?;
    let policy = if mirror {
        UnmappedPolicy::Mirror
    } else {
        UnmappedPolicy::Drop
    };
    let mappings = default_mappings().with_unmapped_policy(policy);
    let (tree, errors) = mesh_installer::translate::to_tree(&mappings, &spec);
    if !errors.is_empty() {
        return Err(format!("Translation failed:\n{}", errors).into());
    }
    write!(output, "{}", to_yaml(&Value::Map(tree))?)?;
    Ok(())
}

fn manifest(
    spec: &Path,
    charts: &Path,
    output_dir: Option<&Path>,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = read_spec(spec)?;
    let renderer = DirectoryRenderer::new(charts);
    let manifests = generate_manifests(&spec, &default_mappings(), &renderer)?;

    match output_dir {
        Some(dir) => {
            for path in write_manifests(dir, &manifests)? {
                writeln!(output, "{}", path.display())?;
            }
        }
        None => {
            let docs: Vec<&str> = manifests
                .values()
                .map(|m| m.as_str())
                .filter(|m| !m.trim().is_empty())
                .collect();
            write!(output, "{}", docs.join("---\n"))?;
        }
    }
    Ok(())
}

fn patch_manifest(
    manifest: &Path,
    overlays: &Path,
    namespace: &str,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(manifest)
        .map_err(|e| format!("Failed to read manifest {:?}: {}", manifest, e))?;
    let overlay_content = fs::read_to_string(overlays)
        .map_err(|e| format!("Failed to read overlays {:?}: {}", overlays, e))?;
    let overlays: Vec<K8sObjectOverlay> = serde_yaml::from_str(&overlay_content)
        .map_err(|e| format!("Failed to parse overlays: {}", e))?;

    let objects = parse_objects(&content)?;
    write!(output, "{}", patch(&objects, namespace, &overlays)?)?;
    Ok(())
}

async fn apply(
    config: &InstallerConfig,
    dir: &Path,
    dry_run: bool,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifests = read_manifests(dir)?;
    let applier: Arc<dyn Applier> = if dry_run {
        Arc::new(DryRunApplier)
    } else {
        Arc::new(KubectlApplier::new(&config.kubectl))
    };
    let session = InstallSession::new(config.dependency_tree()?, applier, config.install_options());

    let report = session.run(manifests).await;
    for (component, outcome) in report.iter() {
        match outcome {
            ComponentOutcome::Applied { objects } => {
                writeln!(output, "{}: applied {} objects", component, objects)?
            }
            ComponentOutcome::NoManifest => writeln!(output, "{}: no manifest", component)?,
            ComponentOutcome::Skipped => writeln!(output, "{}: skipped", component)?,
            ComponentOutcome::Failed(e) => writeln!(output, "{}: failed: {}", component, e)?,
        }
    }
    if !report.is_success() {
        return Err(format!(
            "Installation failed: failed [{}], skipped [{}]",
            report.failed().join(", "),
            report.skipped().join(", ")
        )
        .into());
    }
    Ok(())
}
