use clap::{Parser, Subcommand};
use inquire::Text;

use crate::clients::backend_client::HttpChatTransport;
use crate::service::chat_client::{ChatClient, GREETING};

#[derive(Parser)]
#[command(about = "Chat with the booking assistant")]
struct Cli {
    /// Backend base URL; overrides BACKEND_URL.
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default).
    Chat {
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Send a single message and print the reply.
    Send {
        message: String,
        #[arg(long)]
        session_id: Option<String>,
    },
}

pub async fn cli(default_backend_url: String) {
    // Fine to exit here on bad arguments
    let cli = Cli::parse();
    let backend_url = cli.backend_url.unwrap_or(default_backend_url);
    let transport = HttpChatTransport::new(&backend_url);

    match cli.command.unwrap_or(Commands::Chat { session_id: None }) {
        Commands::Chat { session_id } => {
            let mut client = ChatClient::new(transport, session_id);
            println!("{}", GREETING);
            loop {
                let prompt = match Text::new("What would you like to do?").prompt() {
                    Ok(prompt) => prompt,
                    Err(_) => break,
                };
                let prompt = prompt.trim();
                if prompt.is_empty() || prompt.eq_ignore_ascii_case("exit") {
                    break;
                }
                let reply = client.send(prompt).await;
                println!("{}", reply);
            }
            println!("Session {} closed.", client.session_id());
        }
        Commands::Send {
            message,
            session_id,
        } => {
            let mut client = ChatClient::new(transport, session_id);
            let reply = client.send(&message).await;
            println!("{}", reply);
            println!("(session {})", client.session_id());
        }
    }
}
