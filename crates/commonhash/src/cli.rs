//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use commonhash::core::{DigestAlgorithm, UnreadablePolicy, DEFAULT_BLOCK_SIZE};
use commonhash::sync::EndOfManifest;
use commonhash::tls::{ClientAuth, TlsMaterial};
use commonhash::PeerConfig;

#[derive(Parser)]
#[command(name = "commonhash")]
#[command(about = "Find the files two hosts have in common by comparing content digests over TLS")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the local manifest, fetch the peer's and report common files
    Run(RunArgs),

    /// Print the manifest of a directory
    Hash(HashArgs),

    /// Write a self-signed certificate and key
    GenCert(GenCertArgs),
}

#[derive(Args)]
pub struct TlsArgs {
    /// Certificate presented to the peer
    #[arg(long, env = "COMMONHASH_CERT", default_value = "cert.pem")]
    pub cert: PathBuf,

    /// Private key for --cert
    #[arg(long, env = "COMMONHASH_KEY", default_value = "key.pem")]
    pub key: PathBuf,

    /// Trust anchors for the peer's certificate [default: --cert]
    #[arg(long, env = "COMMONHASH_CA")]
    pub ca: Option<PathBuf>,

    /// Require and verify a client certificate
    #[arg(long, env = "COMMONHASH_MUTUAL_TLS")]
    pub mutual_tls: bool,
}

impl TlsArgs {
    fn material(&self) -> TlsMaterial {
        let ca = self.ca.clone().unwrap_or_else(|| self.cert.clone());
        TlsMaterial::new(self.cert.clone(), self.key.clone(), ca)
    }
}

#[derive(Args)]
pub struct ScanArgs {
    /// Digest algorithm (sha3-512 or blake3-512)
    #[arg(long, env = "COMMONHASH_ALGORITHM", default_value = "sha3-512")]
    pub algorithm: DigestAlgorithm,

    /// Read block size in bytes
    #[arg(long, env = "COMMONHASH_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Leave unreadable files out instead of failing
    #[arg(long, env = "COMMONHASH_SKIP_UNREADABLE")]
    pub skip_unreadable: bool,
}

impl ScanArgs {
    pub fn unreadable_policy(&self) -> UnreadablePolicy {
        if self.skip_unreadable {
            UnreadablePolicy::Skip
        } else {
            UnreadablePolicy::Abort
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Host of the peer to dial
    pub remote_host: String,

    /// Port the peer listens on
    pub remote_port: u16,

    /// Port to listen on
    pub listen_port: u16,

    /// Directory whose files are compared
    pub directory: PathBuf,

    #[command(flatten)]
    pub tls: TlsArgs,

    #[command(flatten)]
    pub scan: ScanArgs,

    /// Name to verify in the peer's certificate [default: remote host]
    #[arg(long, env = "COMMONHASH_SERVER_NAME")]
    pub server_name: Option<String>,

    /// Accept a manifest that ends without its trailer
    #[arg(long, env = "COMMONHASH_LENIENT_EOF")]
    pub lenient_eof: bool,

    /// Connect, handshake and per-read timeout in seconds
    #[arg(
        long,
        env = "COMMONHASH_TIMEOUT_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Peers to serve before exiting (0 = until --linger-secs or Ctrl-C)
    #[arg(long, env = "COMMONHASH_SERVE_SESSIONS", default_value_t = 1)]
    pub serve_sessions: usize,

    /// Stop serving this many seconds after our own fetch completed
    #[arg(long, env = "COMMONHASH_LINGER_SECS")]
    pub linger_secs: Option<u64>,

    /// Wait this many seconds after listening before dialing the peer
    #[arg(long, env = "COMMONHASH_START_DELAY_SECS", default_value_t = 0)]
    pub start_delay_secs: u64,
}

impl RunArgs {
    pub fn peer_config(&self) -> PeerConfig {
        let timeout = Duration::from_secs(self.timeout_secs);
        let mut config = PeerConfig::new(
            self.remote_host.clone(),
            self.remote_port,
            self.listen_port,
            self.directory.clone(),
        );
        config.tls = self.tls.material();
        config.server_name = self.server_name.clone();
        config.client_auth = if self.tls.mutual_tls {
            ClientAuth::Required
        } else {
            ClientAuth::None
        };
        config.algorithm = self.scan.algorithm;
        config.block_size = self.scan.block_size;
        config.unreadable_policy = self.scan.unreadable_policy();
        config.end_of_manifest = if self.lenient_eof {
            EndOfManifest::Lenient
        } else {
            EndOfManifest::RequireTrailer
        };
        config.connect_timeout = timeout;
        config.read_timeout = timeout;
        config.handshake_timeout = timeout;
        config.serve_sessions = (self.serve_sessions > 0).then_some(self.serve_sessions);
        config.linger = self.linger_secs.map(Duration::from_secs);
        config.start_delay = Duration::from_secs(self.start_delay_secs);
        config
    }
}

#[derive(Args)]
pub struct HashArgs {
    /// Directory to hash
    pub directory: PathBuf,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Args)]
pub struct GenCertArgs {
    /// Where to write the certificate
    #[arg(long, default_value = "cert.pem")]
    pub cert: PathBuf,

    /// Where to write the private key
    #[arg(long, default_value = "key.pem")]
    pub key: PathBuf,

    /// Subject alternative names [default: localhost 127.0.0.1 ::1]
    #[arg(long = "name")]
    pub names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_positional_order() {
        let cli = Cli::parse_from([
            "commonhash",
            "run",
            "10.0.0.2",
            "9001",
            "9000",
            "/srv/share",
            "--lenient-eof",
            "--serve-sessions",
            "0",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        let config = args.peer_config();
        assert_eq!(config.remote_host, "10.0.0.2");
        assert_eq!(config.remote_port, 9001);
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.directory, PathBuf::from("/srv/share"));
        assert_eq!(config.end_of_manifest, EndOfManifest::Lenient);
        assert_eq!(config.serve_sessions, None);
        assert_eq!(config.tls.ca_path, PathBuf::from("cert.pem"));
        assert_eq!(config.algorithm, DigestAlgorithm::Sha3_512);
    }

    #[test]
    fn test_hash_accepts_blake3() {
        let cli = Cli::parse_from(["commonhash", "hash", ".", "--algorithm", "blake3-512"]);
        let Commands::Hash(args) = cli.command else {
            panic!("expected hash");
        };
        assert_eq!(args.scan.algorithm, DigestAlgorithm::Blake3_512);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let base = ["commonhash", "run", "peer", "9001", "9000", "."];
        let zero = Cli::try_parse_from(base.iter().chain(&["--timeout-secs", "0"]).copied());
        assert!(zero.is_err());

        let cli = Cli::try_parse_from(base.iter().chain(&["--timeout-secs", "2"]).copied()).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.peer_config().connect_timeout, Duration::from_secs(2));
    }
}
