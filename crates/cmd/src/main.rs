// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use diskq_common_telemetry::{
    logging::{LogFormat, LoggingOptions, init_global_logging},
    panic_hook::set_panic_hook,
};
use diskq_queue::{DiskQueue, QueueBuilder, path::scan_chunk_files};
use snafu::{ResultExt, Whatever};
use uuid::Uuid;

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "diskq",
about= "Durable disk-backed FIFO queue",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    #[command(flatten)]
    queue: QueueArgs,

    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Clone, Args)]
struct QueueArgs {
    /// Directory holding the queue directories.
    #[arg(long, global = true, default_value = "./queue_data")]
    path: PathBuf,

    /// Queue directory name under `--path`.
    #[arg(long, global = true, default_value = "default")]
    queue: String,

    /// Items per chunk file.
    #[arg(long, global = true, default_value_t = 1024)]
    cache_size: usize,

    /// Ceiling on the number of queued items.
    #[arg(long, global = true)]
    max_size: Option<usize>,
}

impl QueueArgs {
    fn open(&self) -> Result<DiskQueue, Whatever> {
        let mut builder = QueueBuilder::new(&self.path)
            .queue_name(self.queue.as_str())
            .cache_size(self.cache_size);
        if let Some(max_size) = self.max_size {
            builder = builder.max_size(max_size);
        }
        builder.build().with_whatever_context(|e| {
            format!(
                "failed to open queue {:?} under {}: {e}",
                self.queue,
                self.path.display()
            )
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct LogArgs {
    /// Level filter, e.g. `info` or `warn,diskq_queue=debug`.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    log_format: LogFormatArg,

    /// Also write hourly rolling log files into this directory.
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

impl LogArgs {
    fn options(&self) -> LoggingOptions {
        LoggingOptions::builder()
            .dir(self.log_dir.clone().unwrap_or_default())
            .level(self.log_level.clone())
            .log_format(self.log_format.into())
            .build()
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    Demo(DemoArgs),
    Put(PutArgs),
    Get(GetArgs),
    Peek(PeekArgs),
    Stat(StatArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Puts random items into the queue, then drains it and a few more.
Examples:

diskq demo
diskq --cache-size 10 demo --count 50

")]
struct DemoArgs {
    #[arg(long, default_value_t = 50)]
    count: usize,
}

impl DemoArgs {
    fn run(&self, queue: &DiskQueue) -> Result<(), Whatever> {
        for _ in 0..self.count {
            let item = Uuid::new_v4().to_string();
            queue
                .put_nowait(item.clone())
                .with_whatever_context(|e| format!("failed to put {item}: {e}"))?;
            println!("put {item}");
        }

        for _ in 0..self.count + 5 {
            match queue
                .get_nowait()
                .whatever_context("failed to get item")?
            {
                Some(item) => println!("get {}", String::from_utf8_lossy(&item)),
                None => println!("get <empty>"),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Enqueues the given items and syncs them to disk.
Examples:

diskq put first second third

")]
struct PutArgs {
    #[arg(required = true)]
    items: Vec<String>,
}

impl PutArgs {
    fn run(&self, queue: &DiskQueue) -> Result<(), Whatever> {
        for item in &self.items {
            queue
                .put_nowait(item.clone())
                .with_whatever_context(|e| format!("failed to put {item}: {e}"))?;
        }
        queue.sync().whatever_context("failed to sync queue")?;
        println!("{} item(s) queued, len = {}", self.items.len(), queue.len());
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Dequeues up to --count items and prints them.
Examples:

diskq get
diskq get --count 10

")]
struct GetArgs {
    #[arg(long, default_value_t = 1)]
    count: usize,
}

impl GetArgs {
    fn run(&self, queue: &DiskQueue) -> Result<(), Whatever> {
        for _ in 0..self.count {
            let Some(item) = queue.get_nowait().whatever_context("failed to get item")? else {
                println!("<empty>");
                break;
            };
            println!("{}", String::from_utf8_lossy(&item));
        }
        queue.sync().whatever_context("failed to sync queue")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Prints up to --count items from the head without removing them.
Examples:

diskq peek --count 5

")]
struct PeekArgs {
    #[arg(long, default_value_t = 10)]
    count: i64,
}

impl PeekArgs {
    fn run(&self, queue: &DiskQueue) -> Result<(), Whatever> {
        let items = queue
            .peek(self.count)
            .whatever_context("failed to peek queue")?;
        if items.is_empty() {
            println!("<empty>");
        }
        for item in items {
            println!("{}", String::from_utf8_lossy(&item));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Prints the index, the queue length and the chunk files on disk.
Examples:

diskq stat

")]
struct StatArgs {}

impl StatArgs {
    fn run(&self, queue: &DiskQueue) -> Result<(), Whatever> {
        let dir = queue.path();
        println!("path:   {}", dir.display());
        println!("head:   {}", queue.head());
        println!("tail:   {}", queue.tail());
        println!("len:    {}", queue.len());

        let chunks = scan_chunk_files(&dir).whatever_context("failed to list chunk files")?;
        println!("chunks: {}", chunks.len());
        for (seq, path) in chunks {
            println!("  {seq:>8}  {}", path.display());
        }
        Ok(())
    }
}

fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();

    let _guards =
        init_global_logging("diskq", &cli.log.options()).whatever_context("failed to init logging")?;
    set_panic_hook();
    tracing::info!(version = build_info::FULL_VERSION, "diskq starting");

    let queue = cli.queue.open()?;
    match &cli.commands {
        Commands::Demo(args) => args.run(&queue)?,
        Commands::Put(args) => args.run(&queue)?,
        Commands::Get(args) => args.run(&queue)?,
        Commands::Peek(args) => args.run(&queue)?,
        Commands::Stat(args) => args.run(&queue)?,
    }
    queue.close().whatever_context("failed to close queue")
}
