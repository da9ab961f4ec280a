//! `acsd-ctl`: the Supervisor control surface CLI (spec.md §6 "Supervisor
//! CLI / control surface, not public wire") — talks to a running
//! `acsd-router`'s `Admin` gRPC service.

use acsd::rpc::proto::admin_client::AdminClient;
use acsd::rpc::proto::{Empty, TenantIdRequest, TenantRecordReply};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "acsd-ctl", about = "Operate a running acsd Router's Supervisor")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:7000")]
    router_addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Idempotent start of a tenant's worker.
    Start { tenant_id: String },
    /// Idempotent stop of a tenant's worker.
    Stop { tenant_id: String },
    /// Snapshot of every known tenant's record.
    List,
    /// Current record for one tenant.
    Health { tenant_id: String },
}

fn print_record(record: TenantRecordReply) {
    println!(
        "{}\tstate={}\tport={}\tgeneration={}\trestarts={}",
        record.tenant_id, record.state, record.listen_port, record.generation, record.restart_count
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut client = AdminClient::connect(cli.router_addr)
        .await?
        .max_decoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE)
        .max_encoding_message_size(acsd::rpc::MAX_MESSAGE_SIZE);

    match cli.command {
        Command::Start { tenant_id } => {
            let response = client.start(TenantIdRequest { tenant_id }).await?;
            print_record(response.into_inner());
        }
        Command::Stop { tenant_id } => {
            client.stop(TenantIdRequest { tenant_id }).await?;
        }
        Command::List => {
            let response = client.list(Empty {}).await?;
            for record in response.into_inner().records {
                print_record(record);
            }
        }
        Command::Health { tenant_id } => {
            let response = client.health(TenantIdRequest { tenant_id }).await?;
            print_record(response.into_inner());
        }
    }

    Ok(())
}
