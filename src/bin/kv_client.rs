use chrono::Local;
use clap::{App, Arg};
use paxos_kv::{ClientError, FrontEndProtocol, KvClient, Response};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};

fn log(message: &str) {
    println!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), message);
}

#[tokio::main]
async fn main() {
    let matches = App::new("kv-client")
        .about("Interactive client for paxos-kv-server")
        .arg(Arg::with_name("host").required(true).help("Front end host"))
        .arg(Arg::with_name("port").required(true).help("Front end port"))
        .arg(
            Arg::with_name("protocol")
                .long("protocol")
                .takes_value(true)
                .default_value("tcp")
                .help("TCP [T] or UDP [U]"),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap_or_default();
    let port = match matches.value_of("port").unwrap_or_default().parse::<u16>() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Invalid port: {}", e);
            process::exit(1);
        }
    };
    let protocol = match matches.value_of("protocol").unwrap_or("tcp").parse::<FrontEndProtocol>() {
        Ok(protocol) => protocol,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let mut client = match KvClient::connect(protocol, host, port).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}:{}: {}", host, port, e);
            process::exit(3);
        }
    };
    log(&format!("Connected to {}:{} over {:?}", host, port, protocol));
    println!("Commands: put <key> <value> | get <key> | del <key> | exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            break;
        }

        let request = match paxos_kv::parse_command(line) {
            Ok(request) => request,
            Err(e) => {
                log(&e.to_string());
                continue;
            }
        };

        match client.send(&request).await {
            Ok(Response::Get { key, value: Some(value) }) => log(&format!("Value for '{}': {}", key, value)),
            Ok(Response::Get { key, value: None }) => log(&format!("No value for '{}'", key)),
            Ok(response) => log(&format!("Success: {}", response)),
            Err(ClientError::Timeout) => log("Server did not respond in time"),
            Err(e @ ClientError::ServerClosed) => {
                log(&e.to_string());
                break;
            }
            Err(e) => log(&format!("Request '{}' failed: {}", request, e)),
        }
    }
}
