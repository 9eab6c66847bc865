use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = compass_api::Args::parse();
	compass_api::run(args).await
}
