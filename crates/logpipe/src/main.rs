use logpipe::runtime::{boot, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    boot::init_logging();
    let runtime = boot::boot().await?;
    serve::serve(runtime).await
}
