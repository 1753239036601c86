use release_asset_pusher::cli::{Args, Runner};

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    let runner = Runner::new(args);
    let code = runner.run().await;
    std::process::exit(code);
}
