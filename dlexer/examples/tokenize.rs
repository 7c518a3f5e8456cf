//! Prints the tokens of stdin.
//!
//! ```sh
//! echo "x = 42 + y" | RUST_LOG=dlexer=trace cargo run --example tokenize -- "[a-z]+|[0-9]+|[-+*/=]"
//! ```
use std::io::Read;

use dlexer::regex::Regex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let pattern = std::env::args().nth(1).ok_or("usage: tokenize <pattern>")?;
    let re = Regex::new(&pattern)?;

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    for token in re.tokens(&input) {
        let text = String::from_utf8_lossy(&input[token.span.range()]);
        print!("{}..{} {text:?}", token.span.start(), token.span.end());
        for (i, group) in token.groups.iter().enumerate() {
            match group {
                Some(span) => print!(" {i}={}..{}", span.start(), span.end()),
                None => print!(" {i}=-"),
            }
        }
        println!();
    }
    Ok(())
}
