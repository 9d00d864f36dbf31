use std::{fs, path::PathBuf};

use awg::{
    config::ParsedDocument,
    export::ClientExport,
    import::{ImportReport, import_full, import_peer},
    peer::{PeerRecord, default_allowed_ips},
};
use clap::{Parser, Subcommand, ValueEnum};
use error::Error;
use form::{InterfaceFields, PeerFields};
use keys::{KeyService, cmd::AwgCmdBackend, local::LocalKeys, public_key_or_placeholder};
use store::{SectionId, SectionStore, Snapshot};

mod awg;
pub(crate) mod error;
mod form;
mod keys;
mod store;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// In-process X25519
    Local,
    /// `$AWG_TOOL genkey|pubkey|genpsk`
    Cmd,
}

#[derive(Debug, clap::Parser)]
#[command(version, about = "AmneziaWG configuration import/export")]
pub struct Args {
    /// Interface state file
    #[arg(long, default_value = "awg-state.bin")]
    state: PathBuf,

    #[arg(long, value_enum, default_value_t = Backend::Local)]
    keys: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a configuration file and report field problems
    Parse { file: PathBuf },

    /// Import a configuration file into the interface
    Import {
        file: PathBuf,

        /// Append the first peer of the file as one new peer
        #[arg(long)]
        peer: bool,
    },

    /// Edit interface fields
    Interface {
        #[command(flatten)]
        fields: InterfaceFields,
    },

    /// List peer sections
    Peers,

    /// Add a peer; keys not given are generated
    AddPeer {
        #[command(flatten)]
        fields: PeerFields,
        /// Generate a preshared key unless one is given
        #[arg(long)]
        psk: bool,
    },

    /// Edit fields of a peer section
    EditPeer {
        section: SectionId,
        #[command(flatten)]
        fields: PeerFields,
    },

    Enable { section: SectionId },
    Disable { section: SectionId },
    Remove { section: SectionId },

    /// Print the client configuration of a peer
    Export {
        section: SectionId,
        /// Host the peer connects to
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, value_delimiter = ',')]
        allowed_ips: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        addresses: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        dns: Vec<String>,
        /// Without I1..I5, as fed to a QR code
        #[arg(long)]
        reduced: bool,
    },

    Genkey,
    Pubkey { private_key: String },
    Genpsk,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if std::env::var_os("RUST_LOG").is_none() {
        unsafe { std::env::set_var("RUST_LOG", "info") };
    }
    env_logger::init();

    let args = Args::parse();

    match args.keys {
        Backend::Local => run(args, &LocalKeys).await,
        Backend::Cmd => run(args, &AwgCmdBackend::default()).await,
    }
}

fn key_error(err: impl std::fmt::Display) -> Error {
    Error::KeyServiceError(err.to_string())
}

async fn run<K: KeyService>(args: Args, keys: &K) -> Result<(), Error> {
    let mut snapshot = Snapshot::load(&args.state)?;

    match args.command {
        Command::Parse { file } => {
            let doc = ParsedDocument::parse(&fs::read_to_string(file)?);
            println!("{doc:#?}");

            for issue in doc.issues() {
                println!("{issue}");
            }
            return Ok(());
        }

        Command::Import { file, peer } => {
            let text = fs::read_to_string(file)?;

            let report = if peer {
                import_peer(&text, &mut snapshot.peers, keys).await?
            } else {
                import_full(&text, &mut snapshot.interface, &mut snapshot.peers)?
            };

            print_report(&report);
        }

        Command::Interface { fields } => {
            let iface = &mut snapshot.interface;
            fields.apply(iface)?;

            let public = public_key_or_placeholder(keys, &iface.private_key).await;
            println!("{iface:#?}");
            println!("public key: {public}");
        }

        Command::Peers => {
            for (id, peer) in snapshot.peers.iter() {
                println!(
                    "{id}{} {} {} [{}] {}",
                    if peer.disabled { " (disabled)" } else { "" },
                    peer.public_key,
                    peer.endpoint().map(|e| e.to_string()).unwrap_or_default(),
                    peer.allowed_ips.join(", "),
                    peer.description.as_deref().unwrap_or_default(),
                );
            }
            return Ok(());
        }

        Command::AddPeer { mut fields, psk } => {
            fields.check()?;

            if fields.public_key.is_none() {
                let pair = match &fields.private_key {
                    Some(private) => keys.derive_public(private).await,
                    None => keys.generate_keypair().await,
                }
                .map_err(key_error)?;

                fields.public_key = Some(pair.public.to_string());
                fields.private_key = Some(pair.private.to_string());
            }

            if psk && fields.preshared_key.is_none() {
                let key = keys.generate_psk().await.map_err(key_error)?;
                fields.preshared_key = Some(key.to_string());
            }

            let mut peer = PeerRecord {
                allowed_ips: default_allowed_ips(),
                ..Default::default()
            };
            fields.apply(&mut peer)?;

            let public = peer.public_key.clone();
            let id = snapshot.peers.add(peer)?;
            println!("{id} {public}");
        }

        Command::EditPeer { section, fields } => {
            let mut peer = snapshot
                .peers
                .get(&section)
                .cloned()
                .ok_or_else(|| store::StoreError::UnknownSection(section.clone()))?;

            fields.apply(&mut peer)?;
            snapshot.peers.set(&section, peer)?;
            log::info!("updated peer section {section}");
        }

        Command::Enable { section } => set_disabled(&mut snapshot, &section, false)?,

        Command::Disable { section } => set_disabled(&mut snapshot, &section, true)?,

        Command::Remove { section } => {
            let peer = snapshot.peers.remove(&section)?;
            log::info!("removed peer {}", peer.public_key);
        }

        Command::Export {
            section,
            endpoint,
            allowed_ips,
            addresses,
            dns,
            reduced,
        } => {
            let iface = &snapshot.interface;
            let peer = snapshot
                .peers
                .get(&section)
                .ok_or(store::StoreError::UnknownSection(section.clone()))?;

            if peer.private_key.is_none() {
                log::warn!("peer {section} has no private key, export lacks PrivateKey");
            }

            let public = public_key_or_placeholder(keys, &iface.private_key).await;
            let mut export = ClientExport::new(iface, public, peer).dns(dns);

            if let Some(host) = endpoint {
                export = export.endpoint(host);
            }
            if let Some(ips) = allowed_ips {
                export = export.allowed_ips(ips);
            }
            if let Some(addresses) = addresses {
                export = export.addresses(addresses);
            }

            if reduced {
                println!("{}", export.reduced_text());
            } else {
                println!("{}", export.full_text());
            }
            return Ok(());
        }

        Command::Genkey => {
            let pair = keys.generate_keypair().await.map_err(key_error)?;
            println!("{}\n{}", pair.private, pair.public);
            return Ok(());
        }

        Command::Pubkey { private_key } => {
            let pair = keys.derive_public(&private_key).await.map_err(key_error)?;
            println!("{}", pair.public);
            return Ok(());
        }

        Command::Genpsk => {
            println!("{}", keys.generate_psk().await.map_err(key_error)?);
            return Ok(());
        }
    }

    snapshot.save(&args.state)
}

fn set_disabled(snapshot: &mut Snapshot, id: &SectionId, disabled: bool) -> Result<(), Error> {
    let mut peer = snapshot
        .peers
        .get(id)
        .cloned()
        .ok_or_else(|| store::StoreError::UnknownSection(id.clone()))?;

    peer.disabled = disabled;
    snapshot.peers.set(id, peer)?;
    Ok(())
}

fn print_report(report: &ImportReport) {
    for id in &report.removed {
        println!("removed {id}");
    }
    for id in &report.added {
        println!("added {id}");
    }
    if let Some(key) = &report.derived_public_key {
        println!("document PrivateKey derives {key}");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
}
