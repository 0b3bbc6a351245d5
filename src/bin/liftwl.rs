//! Thin CLI driver: load a factor graph and queries from a JSON file, run color
//! refinement (or lifting, if `--threshold` is given), build the parfactor
//! graph, and print the emitted model followed by each query's rewrite.

use liftwl::{color, emit, lift, persist, pfg};
use std::env;
use std::fs;
use std::process;

fn usage() -> ! {
    eprintln!("usage: liftwl <graph.json> [--threshold <0..1>]");
    process::exit(2);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }
    let path = &args[1];
    let threshold = args
        .iter()
        .position(|a| a == "--threshold")
        .and_then(|idx| args.get(idx + 1))
        .map(|v| v.parse::<f64>().unwrap_or_else(|_| usage()));

    let contents = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("failed to read '{}': {}", path, e);
        process::exit(1);
    });

    let (mut graph, queries) = persist::load(&contents).unwrap_or_else(|e| {
        eprintln!("failed to load graph: {}", e);
        process::exit(1);
    });

    let coloring = match threshold {
        Some(tau) => lift::lift(&mut graph, tau).unwrap_or_else(|e| {
            eprintln!("lift failed: {}", e);
            process::exit(1);
        }),
        None => color::refine(&graph, None),
    };

    let (parfactor_graph, rv_to_individual) =
        pfg::build(&graph, &coloring, None, None).unwrap_or_else(|e| {
            eprintln!("build failed: {}", e);
            process::exit(1);
        });

    let model_text = emit::emit_model(&parfactor_graph).unwrap_or_else(|e| {
        eprintln!("emit failed: {}", e);
        process::exit(1);
    });
    println!("{}", model_text);

    for query in &queries {
        for line in liftwl::query::rewrite(query, &rv_to_individual) {
            println!("{}", line);
        }
    }
}
