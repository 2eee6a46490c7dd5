use anyhow::{bail, Result};
use futures::StreamExt;
use notes_batch_analyzer::utils::logging;
use notes_batch_analyzer::{load_batch_request, App, Config, Submission};
use std::io::Write;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("用法: notes-batch-analyzer <request.json|request.toml>");
    };

    let request = load_batch_request(&path).await?;

    // 初始化并运行应用
    let app = App::initialize(config).await?;

    match app.submit_batch(request).await {
        Submission::Completed(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                std::process::exit(1);
            }
        }
        Submission::Streaming(mut stream) => {
            let mut stdout = std::io::stdout();
            while let Some(event) = stream.next().await {
                stdout.write_all(event.to_sse_frame()?.as_bytes())?;
                stdout.flush()?;
            }
        }
    }

    Ok(())
}
