use std::{env, fs, process};

use av1_obu_parser::parser::{ParsedObu, Parser};

fn main() {
    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: simple <input.ivf>");
            process::exit(1);
        }
    };

    let bytes = fs::read(&path).expect("read input file");
    let ivf_header = av1_obu_parser::ivf::parse_ivf_header(&bytes).expect("parse IVF header");
    println!("{ivf_header:#?}");

    let mut parser = Parser::new();
    for frame in av1_obu_parser::ivf::IvfFrameIter::new(&bytes) {
        let mut offset = 0usize;
        while offset < frame.data.len() {
            match parser.parse_next_obu(&frame.data[offset..]) {
                Ok((ParsedObu::Dropped, consumed)) => offset += consumed,
                Ok((parsed, consumed)) => {
                    println!("{parsed:#?}");
                    offset += consumed;
                }
                Err(err) => {
                    eprintln!("parse error at byte {offset}: {err}");
                    break;
                }
            }
        }
    }
}
