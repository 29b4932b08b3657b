//! obu CLI - OpenShift build utilities

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use obu::commands::mirror::MirrorSelection;
use obu::commands::proxy::ProxySelection;
use obu::commands::registry::RegistrySelection;
use obu::commands::translate::TranslateOptions;
use obu::config::Settings;
use obu::image::ResolutionMode;
use obu::utils::logger;
use obu::{ObuError, log_debug};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "obu")]
#[command(author, version, about = "Build utilities for OpenShift clusters", long_about = None)]
struct Cli {
    /// Path to the kubeconfig file (default: $KUBECONFIG, in-cluster config, ~/.kube/config)
    #[arg(long, global = true, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an image stream tag into a pullable image reference
    #[command(after_help = "Examples:\n  \
        obu translate nodejs:12 -n openshift\n  \
        obu translate nodejs:latest -n openshift --override-local\n  \
        obu translate nodejs:latest -n openshift --override-local --sha-vs-tag")]
    Translate {
        /// Image stream tag in the form <stream>:<tag>
        reference: String,

        /// Namespace of the image stream (default: current project)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Ignore a Local reference policy and print the tag's source image
        #[arg(long)]
        override_local: bool,

        /// With --override-local, print the newest digest instead of the source tag
        #[arg(long, requires = "override_local")]
        sha_vs_tag: bool,
    },

    /// Print cluster proxy settings
    Proxy(ProxyArgs),

    /// Print internal image registry settings
    Registry {
        #[command(flatten)]
        selection: RegistryArgs,

        /// Namespace of the builder service account (default: current project)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Print registry mirror settings
    Mirror(MirrorArgs),

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct ProxyArgs {
    /// Print the HTTP proxy URL
    #[arg(long)]
    http_proxy: bool,

    /// Print the HTTPS proxy URL
    #[arg(long)]
    https_proxy: bool,

    /// Print the no-proxy list
    #[arg(long)]
    no_proxy: bool,

    /// Print all proxy settings as environment variable assignments
    #[arg(long)]
    env_vars: bool,

    /// Print the proxy CA bundle
    #[arg(long)]
    ca_data: bool,
}

impl ProxyArgs {
    fn selection(&self) -> Option<ProxySelection> {
        [
            (self.http_proxy, ProxySelection::HttpProxy),
            (self.https_proxy, ProxySelection::HttpsProxy),
            (self.no_proxy, ProxySelection::NoProxy),
            (self.env_vars, ProxySelection::EnvVars),
            (self.ca_data, ProxySelection::CaData),
        ]
        .into_iter()
        .find_map(|(set, selection)| set.then_some(selection))
    }
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct RegistryArgs {
    /// Print the CA bundle that signs the internal registry's certificate
    #[arg(long)]
    ca_data: bool,

    /// Print the builder service account's internal registry pull secret
    #[arg(long)]
    docker_cfg_file: bool,
}

impl RegistryArgs {
    fn selection(&self) -> Option<RegistrySelection> {
        [
            (self.ca_data, RegistrySelection::CaData),
            (self.docker_cfg_file, RegistrySelection::DockerCfgFile),
        ]
        .into_iter()
        .find_map(|(set, selection)| set.then_some(selection))
    }
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct MirrorArgs {
    /// Print the additional trusted CAs for mirror registries
    #[arg(long)]
    ca_data: bool,

    /// Print a registries.conf with mirror, insecure and blocked registries
    #[arg(long)]
    docker_cfg_file: bool,
}

impl MirrorArgs {
    fn selection(&self) -> Option<MirrorSelection> {
        [
            (self.ca_data, MirrorSelection::CaData),
            (self.docker_cfg_file, MirrorSelection::DockerCfgFile),
        ]
        .into_iter()
        .find_map(|(set, selection)| set.then_some(selection))
    }
}

fn resolution_mode(override_local: bool, sha_vs_tag: bool) -> ResolutionMode {
    match (override_local, sha_vs_tag) {
        (true, true) => ResolutionMode::SourceDigest,
        (true, false) => ResolutionMode::Source,
        _ => ResolutionMode::LocalPolicy,
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logger::init(cli.verbose);
    let settings = Settings::load();
    log_debug!("{:?}", cli.command);

    if let Err(e) = run(cli, &settings).await {
        e.display();
        if settings.behavior.exit_nonzero_on_error {
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, settings: &Settings) -> obu::Result<()> {
    let kubeconfig = cli.kubeconfig.as_deref();

    match cli.command {
        Commands::Translate {
            reference,
            namespace,
            override_local,
            sha_vs_tag,
        } => {
            let options = TranslateOptions {
                reference,
                namespace,
                mode: resolution_mode(override_local, sha_vs_tag),
            };
            obu::commands::translate::execute(kubeconfig, settings, options).await
        }
        Commands::Proxy(args) => obu::commands::proxy::execute(kubeconfig, args.selection()).await,
        Commands::Registry {
            selection,
            namespace,
        } => {
            obu::commands::registry::execute(kubeconfig, settings, selection.selection(), namespace)
                .await
        }
        Commands::Mirror(args) => {
            obu::commands::mirror::execute(kubeconfig, args.selection()).await
        }
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    }
}

fn handle_completion_command(shell: Shell) -> Result<(), ObuError> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "obu", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<(), ObuError> {
    println!("obu {}", env!("CARGO_PKG_VERSION"));
    println!("Build utilities for OpenShift clusters");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("obu").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_translate_modes() {
        let cli = parse(&["translate", "nodejs:12", "-n", "openshift", "--override-local"]).unwrap();
        let Commands::Translate {
            reference,
            namespace,
            override_local,
            sha_vs_tag,
        } = cli.command
        else {
            panic!("expected translate");
        };
        assert_eq!(reference, "nodejs:12");
        assert_eq!(namespace.as_deref(), Some("openshift"));
        assert_eq!(resolution_mode(override_local, sha_vs_tag), ResolutionMode::Source);

        assert_eq!(resolution_mode(false, false), ResolutionMode::LocalPolicy);
        assert_eq!(resolution_mode(true, true), ResolutionMode::SourceDigest);
    }

    #[test]
    fn test_sha_vs_tag_requires_override_local() {
        assert!(parse(&["translate", "nodejs:12", "--sha-vs-tag"]).is_err());
        assert!(parse(&["translate", "nodejs:12", "--override-local", "--sha-vs-tag"]).is_ok());
    }

    #[test]
    fn test_selection_flags_are_exclusive() {
        assert!(parse(&["proxy", "--http-proxy", "--no-proxy"]).is_err());
        assert!(parse(&["registry", "--ca-data", "--docker-cfg-file"]).is_err());
        assert!(parse(&["mirror", "--ca-data", "--docker-cfg-file"]).is_err());
    }

    #[test]
    fn test_selection_mapping() {
        let cli = parse(&["proxy", "--https-proxy"]).unwrap();
        let Commands::Proxy(args) = cli.command else {
            panic!("expected proxy");
        };
        assert_eq!(args.selection(), Some(ProxySelection::HttpsProxy));

        let cli = parse(&["registry", "--docker-cfg-file", "-n", "builds"]).unwrap();
        let Commands::Registry {
            selection,
            namespace,
        } = cli.command
        else {
            panic!("expected registry");
        };
        assert_eq!(selection.selection(), Some(RegistrySelection::DockerCfgFile));
        assert_eq!(namespace.as_deref(), Some("builds"));

        let cli = parse(&["mirror"]).unwrap();
        let Commands::Mirror(args) = cli.command else {
            panic!("expected mirror");
        };
        assert_eq!(args.selection(), None);

        let cli = parse(&["mirror", "--ca-data"]).unwrap();
        let Commands::Mirror(args) = cli.command else {
            panic!("expected mirror");
        };
        assert_eq!(args.selection(), Some(MirrorSelection::CaData));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["mirror", "--ca-data", "--kubeconfig", "/tmp/kc", "-vv"]).unwrap();
        assert_eq!(cli.kubeconfig, Some(PathBuf::from("/tmp/kc")));
        assert_eq!(cli.verbose, 2);
    }
}
