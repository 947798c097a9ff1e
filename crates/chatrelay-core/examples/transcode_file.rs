//! Transcodes a captured upstream SSE dump and prints the normalized frames.
//!
//! Usage: `cargo run -p chatrelay-core --example transcode_file -- dump.txt [model]`

use std::io::BufRead as _;

use chatrelay_core::{ChunkBuilder, Transcoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: transcode_file <dump> [model]")?;
    let model = args.next().unwrap_or_else(|| "hunyuan".to_string());

    let file = std::io::BufReader::new(std::fs::File::open(path)?);
    let lines = file.lines().collect::<Result<Vec<_>, _>>()?;

    for event in Transcoder::new(ChunkBuilder::new(model)).transcode_lines(lines) {
        print!("{}", event?.to_sse()?);
    }
    Ok(())
}
