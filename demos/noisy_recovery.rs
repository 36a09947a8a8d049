//! Recover packet boundaries when timing gaps are missing
//!
//! Half of the frames are sent back to back with no idle time, so timing
//! alone merges them. The checksum signal splits them again.

use sniffer_core::{infer_packets, ByteStream, ChecksumKind, InferenceParams, PacketSignal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("SerialSniffer Noisy Recovery Example\n");

    // Step 1: Build 12 XOR-terminated frames
    let kind = ChecksumKind::Xor;
    let mut samples = Vec::new();
    let mut t_ns = 0u64;

    for i in 0..12u8 {
        let payload = format!("T{:02}={}", i, 20 + i % 7);
        for b in kind.frame(payload.as_bytes()) {
            samples.push((b, t_ns));
            t_ns += 1_041_667;
        }
        // Step 2: Drop the idle gap after every other frame
        if i % 2 == 1 {
            t_ns += 15_000_000;
        }
    }

    let stream = ByteStream::from_samples(samples)?;
    println!("Built stream: {} bytes\n", stream.len());

    // Step 3: Timing only
    let timing = infer_packets(&stream, InferenceParams::default().auto_detect(false))?;
    println!("Timing only: {} packets", timing.len());

    // Step 4: Timing + checksum
    let combined = infer_packets(&stream, InferenceParams::default().checksum(kind))?;
    println!("With XOR checksum: {} packets\n", combined.len());

    for packet in &combined {
        let marker = if packet.signal == PacketSignal::Checksum { "✓" } else { "?" };
        println!(
            "  {} [{:>3}, {:>3}) {:<8} confidence {:.2}  {}",
            marker,
            packet.start,
            packet.end,
            packet.signal,
            packet.confidence,
            String::from_utf8_lossy(&stream.slice(packet.start..packet.end - 1)),
        );
    }

    Ok(())
}
