use health_report::dispatch;
use health_report::exporters::HealthExporter;
use std::process;

#[tokio::main]
async fn main() {
    let code = dispatch::run(std::env::args_os().skip(1), &HealthExporter).await;
    process::exit(code);
}
