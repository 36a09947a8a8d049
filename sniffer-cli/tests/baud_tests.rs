use sniffer_cli::commands::baud::{self, BaudArgs};
use std::fs;
use tempfile::tempdir;

fn run(contents: &str) -> String {
    colored::control::set_override(false);
    let dir = tempdir().unwrap();
    let input = dir.path().join("edges.txt");
    fs::write(&input, contents).unwrap();

    let args = BaudArgs {
        input: input.to_str().unwrap().to_string(),
    };
    let mut out = Vec::new();
    baud::execute(&args, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_baud_9600() {
    let mut t = 0u64;
    let mut text = String::from("# edges in microseconds\n");
    for p in [104u64, 208, 104, 312, 104, 104, 416, 208, 104, 520] {
        text.push_str(&format!("{}\n", t));
        t += p;
    }
    text.push_str(&format!("{}\n", t));

    let output = run(&text);
    assert!(output.contains("Edges:             11"));
    assert!(output.contains("Baud rate:         9600"));
}

#[test]
fn test_baud_too_few_edges() {
    let output = run("0\n104\n208\n");
    assert!(output.contains("Baud rate:         Unknown"));
}

#[test]
fn test_baud_invalid_line() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("edges.txt");
    fs::write(&input, "0\nfoo\n").unwrap();

    let args = BaudArgs {
        input: input.to_str().unwrap().to_string(),
    };
    let mut out = Vec::new();
    assert!(baud::execute(&args, &mut out).is_err());
}
