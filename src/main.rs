use clap::{App, Arg, ArgMatches};
use paxos_kv::{
    ClusterConfig, ConfigError, FrontEndError, FrontEndProtocol, KeyValueStore, PaxosOptions, ReplicaConfig,
    ReplicaCreationError, TcpFrontEnd, UdpFrontEnd,
};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "serverConfig.txt";

#[derive(Debug, thiserror::Error)]
enum ServerFailure {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Protocol(String),
    #[error("Invalid port '{0}', expected 1024..=65535")]
    Port(String),
    #[error("Bad cluster config")]
    Config(#[from] ConfigError),
    #[error("Failed to create log file")]
    Logging(#[source] io::Error),
    #[error("Failed to start replica")]
    Replica(#[from] ReplicaCreationError),
    #[error("Front end failed")]
    FrontEnd(#[from] FrontEndError),
}

impl ServerFailure {
    fn exit_code(&self) -> i32 {
        match self {
            ServerFailure::Usage(_) => 1,
            ServerFailure::Protocol(_) => 2,
            ServerFailure::Replica(_) | ServerFailure::FrontEnd(_) | ServerFailure::Logging(_) => 3,
            ServerFailure::Port(_) | ServerFailure::Config(_) => 4,
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = App::new("paxos-kv-server")
        .about("Key-value store replicated with Paxos")
        .arg(
            Arg::with_name("port")
                .required(true)
                .help("Port the client front end listens on"),
        )
        .arg(
            Arg::with_name("server_id")
                .required(true)
                .help("This replica's ID. It must appear in the cluster config"),
        )
        .arg(
            Arg::with_name("protocol")
                .long("protocol")
                .takes_value(true)
                .default_value("tcp")
                .help("Front end protocol: TCP [T] or UDP [U]"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG_FILE)
                .help("Cluster config, one '<replicaId> <host>[:<port>]' per line"),
        )
        .arg(
            Arg::with_name("majority")
                .long("majority")
                .takes_value(true)
                .help("Replies needed for consensus. Defaults to a strict majority of the cluster config"),
        )
        .arg(
            Arg::with_name("log_dir")
                .long("log-dir")
                .takes_value(true)
                .help("Write logs under this directory instead of stdout"),
        )
        .get_matches();

    if let Err(failure) = run(&matches).await {
        eprintln!("{}", failure);
        let mut source = std::error::Error::source(&failure);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(failure.exit_code());
    }
}

async fn run(matches: &ArgMatches<'_>) -> Result<(), ServerFailure> {
    // Required args and defaulted args are always present.
    let port_arg = matches.value_of("port").unwrap_or_default();
    let server_id = matches.value_of("server_id").unwrap_or_default().to_string();
    let protocol_arg = matches.value_of("protocol").unwrap_or("tcp");
    let config_path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG_FILE);

    let port = match port_arg.parse::<u16>() {
        Ok(port) if port >= 1024 => port,
        _ => return Err(ServerFailure::Port(port_arg.to_string())),
    };
    let protocol = protocol_arg.parse::<FrontEndProtocol>().map_err(ServerFailure::Protocol)?;
    let majority = match matches.value_of("majority") {
        Some(majority) => Some(
            majority
                .parse::<usize>()
                .map_err(|e| ServerFailure::Usage(format!("Invalid --majority '{}': {}", majority, e)))?,
        ),
        None => None,
    };

    let cluster_config = ClusterConfig::from_file(config_path)?;
    cluster_config.member(&server_id)?;

    let logger = match matches.value_of("log_dir") {
        Some(log_dir) => {
            paxos_kv::create_root_logger_for_file(log_dir, server_id.clone()).map_err(ServerFailure::Logging)?
        }
        None => paxos_kv::create_root_logger_for_stdout(server_id.clone()),
    };

    let replica = paxos_kv::try_create_replica(ReplicaConfig {
        my_replica_id: server_id,
        cluster_members: cluster_config.cluster_members,
        info_logger: logger.clone(),
        options: PaxosOptions {
            majority,
            ..PaxosOptions::default()
        },
    })
    .await?;

    let store: Arc<dyn KeyValueStore> = Arc::new(replica.store.clone());
    let front_end_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let front_end_logger = logger.new(slog::o!("Role" => "FrontEnd"));
    let (shutdown_handle, shutdown_signal) = paxos_kv::shutdown_signal();

    let front_end = match protocol {
        FrontEndProtocol::Tcp => {
            let front_end = TcpFrontEnd::bind(front_end_logger, store, front_end_addr).await?;
            tokio::spawn(front_end.run(shutdown_signal))
        }
        FrontEndProtocol::Udp => {
            let front_end = UdpFrontEnd::bind(front_end_logger, store, front_end_addr).await?;
            tokio::spawn(front_end.run(shutdown_signal))
        }
    };
    slog::info!(logger, "Replica {} serving {:?} clients on port {}", replica.replica_id(), protocol, port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            slog::info!(logger, "Interrupted. Shutting down.");
            shutdown_handle.shutdown();
            replica.stop();
            Ok(())
        }
        // The front end only returns on shutdown, so getting here means its task panicked.
        result = front_end => {
            replica.stop();
            result.map_err(|join_error| {
                ServerFailure::FrontEnd(FrontEndError::Io(io::Error::new(io::ErrorKind::Other, join_error)))
            })
        }
    }
}
