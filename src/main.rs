use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::fmt;

mod cli;

fn main() {
    // 解析命令行参数
    let cli = cli::Cli::parse();

    // 初始化日志系统，日志写到 stderr，stdout 留给命令输出
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // 执行命令
    if let Err(e) = cli::execute(cli) {
        error!("Error: {}", e);

        // 打印错误链
        let mut source = e.source();
        while let Some(e) = source {
            error!("Caused by: {}", e);
            source = e.source();
        }

        std::process::exit(1);
    }
}
