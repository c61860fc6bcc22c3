use clap::Parser;

use consentvault_lib::config::Settings;

#[tokio::main]
async fn main() {
    let settings = Settings::parse();
    consentvault_lib::init_tracing();

    if let Err(e) = consentvault_lib::run(settings).await {
        tracing::error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}
