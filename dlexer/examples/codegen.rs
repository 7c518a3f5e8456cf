//! Writes a C tokenizer for a pattern.
//!
//! ```sh
//! cargo run --example codegen -- "([a-z]+)=([0-9]+)" kv.c
//! cc -o kv kv.c && ./kv "a=1 bb=22"
//! ```
use dlexer::{codegen::Program, regex::Regex};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(pattern), Some(path)) = (args.next(), args.next()) else {
        return Err("usage: codegen <pattern> <output.c>".into());
    };
    let re = Regex::new(&pattern)?;
    Program::builder()
        .function_prefix("tok_")
        .build()
        .write(&re, &path)?;
    eprintln!("wrote {path}");
    Ok(())
}
