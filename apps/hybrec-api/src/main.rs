use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hybrec_api::Args::parse();

	hybrec_api::run(args).await
}
