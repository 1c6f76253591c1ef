use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use clockpool::storage::buffer::{BufferPoolConfig, BufferPoolManager};
use clockpool::storage::disk::{DiskFile, FileHandle, PageFile};

#[derive(Parser)]
#[command(author, version, about = "Clockpool CLI - exercise the buffer pool against a page file")]
struct Cli {
    /// Page file path
    #[arg(short, long, default_value = "database.db")]
    db_path: PathBuf,

    /// Buffer pool size (number of frames)
    #[arg(short, long, default_value_t = BufferPoolConfig::default().pool_size)]
    buffer_size: usize,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh page file holding the given number of pages
    Create {
        #[arg(short, long, default_value_t = 64)]
        pages: u32,
    },

    /// Show page file information
    Info,

    /// Run a fetch/unpin workload through the buffer pool and dump its frames
    Workload {
        /// Number of page accesses
        #[arg(short, long, default_value_t = 10_000)]
        accesses: u64,

        /// Every n-th access dirties its page (0 for read only)
        #[arg(short, long, default_value_t = 4)]
        write_every: u64,

        /// Flush and release the file's pages when done
        #[arg(long)]
        flush: bool,
    },
}

fn create(cli: &Cli, pages: u32) -> Result<()> {
    let file = DiskFile::create(&cli.db_path)
        .with_context(|| format!("Failed to create {}", cli.db_path.display()))?;
    for _ in 0..pages {
        file.allocate_page()?;
    }
    println!("Created {} with {} pages", cli.db_path.display(), pages);
    Ok(())
}

fn info(cli: &Cli) -> Result<()> {
    let file = DiskFile::open(&cli.db_path)
        .with_context(|| format!("Failed to open {}", cli.db_path.display()))?;
    let header = file.header();

    println!("Clockpool page file: {}", cli.db_path.display());
    println!("  Allocated slots: {}", header.num_pages);
    println!("  Pages in use:    {}", header.used_pages());
    println!("  Free pages:      {}", header.num_free);
    println!("  Free list head:  {}", header.free_head);
    Ok(())
}

fn workload(cli: &Cli, accesses: u64, write_every: u64, flush: bool) -> Result<()> {
    let disk_file = DiskFile::open(&cli.db_path)
        .with_context(|| format!("Failed to open {}", cli.db_path.display()))?;
    let num_pages = disk_file.header().num_pages;
    if num_pages == 0 {
        anyhow::bail!("{} holds no pages; run `create` first", cli.db_path.display());
    }

    let file = FileHandle::new(disk_file);
    let pool = BufferPoolManager::with_config(BufferPoolConfig::new(cli.buffer_size))?;

    for i in 0..accesses {
        // Strided walk that revisits a hot subset more often than the rest
        let page_id = if i % 3 == 0 {
            (i / 3 % u64::from(num_pages.min(8))) as u32 + 1
        } else {
            (i.wrapping_mul(7919) % u64::from(num_pages)) as u32 + 1
        };

        let page = match pool.fetch_page(&file, page_id) {
            Ok(page) => page,
            Err(err) => {
                eprintln!("Fetch of page {} failed: {}", page_id, err);
                continue;
            }
        };

        let dirty = write_every != 0 && i % write_every == 0;
        if dirty {
            let mut guard = page.write()?;
            let counter = u64::from_le_bytes(guard.data[0..8].try_into()?);
            guard.data[0..8].copy_from_slice(&(counter + 1).to_le_bytes());
        }
        pool.unpin_page(&file, page_id, dirty)?;
    }

    if flush {
        pool.flush_file(&file)?;
    }

    let snapshot = pool.snapshot();
    println!("{}", snapshot);
    println!(
        "hits: {}  misses: {}  evictions: {}  writebacks: {}",
        snapshot.stats.hits, snapshot.stats.misses, snapshot.stats.evictions, snapshot.stats.writebacks
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Create { pages } => create(&cli, *pages),
        Commands::Info => info(&cli),
        Commands::Workload {
            accesses,
            write_every,
            flush,
        } => workload(&cli, *accesses, *write_every, *flush),
    }
}
