// SPDX-License-Identifier: PMPL-1.0-or-later

//! Busy work for the main-thread hang.
//!
//! Each workload is a small tree of named, never-inlined stages, so a sampled
//! hang shows several recognizable frames deep instead of one hot loop.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::hint::black_box;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Network,
    Json,
    Image,
    Database,
    Layout,
}

impl Workload {
    pub const ALL: [Workload; 5] = [
        Workload::Network,
        Workload::Json,
        Workload::Image,
        Workload::Database,
        Workload::Layout,
    ];

    #[inline(never)]
    pub fn run<R: Rng + ?Sized>(self, rng: &mut R) {
        match self {
            Workload::Network => simulate_network(rng),
            Workload::Json => simulate_json(),
            Workload::Image => simulate_image(rng),
            Workload::Database => simulate_database(rng),
            Workload::Layout => simulate_layout(),
        }
    }
}

#[inline(never)]
pub fn dispatch_workload<R: Rng + ?Sized>(rng: &mut R) {
    if let Some(workload) = Workload::ALL.choose(rng) {
        workload.run(rng);
    }
}

// Network

#[inline(never)]
fn simulate_network<R: Rng + ?Sized>(rng: &mut R) {
    parse_http_headers();
    deserialize_response_body();
    validate_tls_certificate(rng);
}

#[inline(never)]
fn parse_http_headers() {
    let headers = "Content-Type: application/json\r\nContent-Length: 1024\r\nX-Request-Id: 7f3a";
    for _ in 0..50 {
        let parsed: Vec<(String, String)> = headers
            .split("\r\n")
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();
        black_box(parsed);
    }
}

#[inline(never)]
fn deserialize_response_body() {
    decode_base64_payload();
    inflate_compressed_body();
}

#[inline(never)]
fn decode_base64_payload() {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let body = "abc123".repeat(100);
    for _ in 0..30 {
        let encoded: String = body
            .as_bytes()
            .chunks(3)
            .flat_map(|chunk| {
                let word = chunk
                    .iter()
                    .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
                    << (8 * (3 - chunk.len()));
                (0..4).map(move |i| ALPHABET[((word >> (18 - 6 * i)) & 0x3f) as usize] as char)
            })
            .collect();
        black_box(encoded);
    }
}

#[inline(never)]
fn inflate_compressed_body() {
    let inflated: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    let checksum = inflated
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_add(u64::from(b)));
    black_box(checksum);
}

#[inline(never)]
fn validate_tls_certificate<R: Rng + ?Sized>(rng: &mut R) {
    compute_certificate_hash();
    verify_certificate_chain(rng);
}

#[inline(never)]
fn compute_certificate_hash() {
    let mut hash: u64 = 0;
    for i in 0..10_000u64 {
        hash = hash.wrapping_mul(31).wrapping_add(i);
    }
    black_box(hash);
}

#[inline(never)]
fn verify_certificate_chain<R: Rng + ?Sized>(rng: &mut R) {
    for _ in 0..20 {
        let mut links: Vec<u32> = (0..100).map(|_| rng.gen()).collect();
        links.sort_unstable();
        black_box(links);
    }
}

// JSON

#[inline(never)]
fn simulate_json() {
    tokenize_json_text();
    build_syntax_tree();
    bind_to_model();
}

#[inline(never)]
fn tokenize_json_text() {
    let document = "{\"key\":\"value\"},".repeat(200);
    let tokens = document
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_ascii_punctuation())
        .count();
    black_box(tokens);
}

#[inline(never)]
fn build_syntax_tree() {
    parse_object_node();
    parse_array_node();
}

#[inline(never)]
fn parse_object_node() {
    let object: HashMap<String, u64> = (0..500u64).map(|i| (format!("key_{}", i), i * 2)).collect();
    black_box(object.values().sum::<u64>());
}

#[inline(never)]
fn parse_array_node() {
    let arrays: Vec<Vec<u32>> = (0..50).map(|_| (0..100).collect()).collect();
    black_box(arrays.iter().flatten().count());
}

#[inline(never)]
fn bind_to_model() {
    map_json_to_model();
    validate_model_constraints();
}

#[inline(never)]
fn map_json_to_model() {
    let models: Vec<(u32, String, f64)> = (0..200u32)
        .map(|i| (i, format!("Model_{}", i), f64::from(i) * 1.5))
        .collect();
    black_box(models.iter().map(|m| m.2).sum::<f64>());
}

#[inline(never)]
fn validate_model_constraints() {
    for _ in 0..100 {
        let valid: Vec<f64> = (0..50u32)
            .map(f64::from)
            .filter(|v| *v > 25.0)
            .map(|v| v * 2.0)
            .collect();
        black_box(valid);
    }
}

// Image

#[inline(never)]
fn simulate_image<R: Rng + ?Sized>(rng: &mut R) {
    decode_pixel_buffer(rng);
    apply_color_transform(rng);
    encode_compressed_output();
}

#[inline(never)]
fn decode_pixel_buffer<R: Rng + ?Sized>(rng: &mut R) {
    read_bitmap_header();
    decompress_pixel_data(rng);
}

#[inline(never)]
fn read_bitmap_header() {
    let header: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
    black_box(&header[..54]);
}

#[inline(never)]
fn decompress_pixel_data<R: Rng + ?Sized>(rng: &mut R) {
    let pixels: Vec<u32> = (0..2000).map(|_| rng.gen::<u32>() & 0xff).collect();
    black_box(pixels);
}

#[inline(never)]
fn apply_color_transform<R: Rng + ?Sized>(rng: &mut R) {
    convert_rgb_to_hsl(rng);
    adjust_saturation(rng);
    convert_hsl_to_rgb(rng);
}

#[inline(never)]
fn convert_rgb_to_hsl<R: Rng + ?Sized>(rng: &mut R) {
    for _ in 0..500 {
        let (r, g, b): (f64, f64, f64) = (rng.gen(), rng.gen(), rng.gen());
        let lightness = (r.max(g).max(b) + r.min(g).min(b)) / 2.0;
        black_box(lightness);
    }
}

#[inline(never)]
fn adjust_saturation<R: Rng + ?Sized>(rng: &mut R) {
    let values: Vec<f64> = (0..1000)
        .map(|_| (rng.gen::<f64>() * 1.2).min(1.0))
        .collect();
    black_box(values);
}

#[inline(never)]
fn convert_hsl_to_rgb<R: Rng + ?Sized>(rng: &mut R) {
    for _ in 0..500 {
        let hue: f64 = rng.gen_range(0.0..=360.0);
        let saturation: f64 = rng.gen();
        let lightness: f64 = rng.gen();
        let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        black_box(chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs()));
    }
}

#[inline(never)]
fn encode_compressed_output() {
    let encoded: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();
    black_box(encoded.len());
}

// Database

#[inline(never)]
fn simulate_database<R: Rng + ?Sized>(rng: &mut R) {
    parse_query_statement();
    execute_query_plan(rng);
    fetch_result_set();
}

#[inline(never)]
fn parse_query_statement() {
    tokenize_sql_keywords();
    build_query_tree();
}

#[inline(never)]
fn tokenize_sql_keywords() {
    let sql = "SELECT id, name, value FROM users WHERE status = 'active' ORDER BY created_at DESC LIMIT 100";
    for _ in 0..100 {
        let keywords: Vec<String> = sql.split(' ').map(str::to_uppercase).collect();
        black_box(keywords);
    }
}

#[inline(never)]
fn build_query_tree() {
    let tree: BTreeMap<String, Vec<String>> = (0..100)
        .map(|i| {
            let children = (0..5).map(|c| format!("child_{}", c)).collect();
            (format!("node_{}", i), children)
        })
        .collect();
    black_box(tree.values().map(Vec::len).sum::<usize>());
}

#[inline(never)]
fn execute_query_plan<R: Rng + ?Sized>(rng: &mut R) {
    scan_table_index();
    join_related_tables();
    sort_result_rows(rng);
}

#[inline(never)]
fn scan_table_index() {
    let index: BTreeMap<u32, String> = (0..1000).map(|i| (i, format!("row_{}", i))).collect();
    black_box(index.keys().filter(|k| *k % 2 == 0).count());
}

#[inline(never)]
fn join_related_tables() {
    let left: Vec<(String, u32)> = (0..200).map(|i| (format!("id_{}", i), i)).collect();
    let right: Vec<(String, u32)> = (0..200).map(|i| (format!("id_{}", i), i * 2)).collect();
    let mut joined = Vec::new();
    for (lk, lv) in &left {
        for (rk, rv) in &right {
            if lk == rk {
                joined.push((lk.as_str(), *lv, *rv));
            }
        }
    }
    black_box(joined.len());
}

#[inline(never)]
fn sort_result_rows<R: Rng + ?Sized>(rng: &mut R) {
    let mut rows: Vec<u32> = (0..500).map(|_| rng.gen()).collect();
    rows.sort_unstable();
    black_box(rows.first().copied());
}

#[inline(never)]
fn fetch_result_set() {
    let results: Vec<(u32, String, bool)> = (0..100)
        .map(|i| (i, format!("Item {}", i), i % 2 == 0))
        .collect();
    black_box(results.iter().filter(|r| r.2).count());
}

// Layout

#[inline(never)]
fn simulate_layout() {
    measure_text_content();
    calculate_constraints();
    resolve_layout_pass();
}

#[inline(never)]
fn measure_text_content() {
    compute_glyph_widths();
    calculate_line_breaks();
}

#[inline(never)]
fn compute_glyph_widths() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let width: f64 = text.bytes().map(|b| f64::from(b) * 0.6).sum();
    black_box(width);
}

#[inline(never)]
fn calculate_line_breaks() {
    let mut lines: Vec<Vec<String>> = vec![Vec::new()];
    let mut line_width = 0.0;
    for word in (0..200).map(|i| format!("word{}", i)) {
        let word_width = word.len() as f64 * 8.0;
        if line_width + word_width > 300.0 {
            lines.push(Vec::new());
            line_width = 0.0;
        }
        line_width += word_width;
        if let Some(line) = lines.last_mut() {
            line.push(word);
        }
    }
    black_box(lines.len());
}

#[inline(never)]
fn calculate_constraints() {
    solve_linear_equations();
    propagate_constraint_changes();
}

#[inline(never)]
fn solve_linear_equations() {
    let matrix: Vec<Vec<f64>> = (0..50u32)
        .map(|i| (0..50u32).map(|j| f64::from(i + j)).collect())
        .collect();
    black_box(matrix.iter().map(|row| row.iter().sum::<f64>()).sum::<f64>());
}

#[inline(never)]
fn propagate_constraint_changes() {
    let mut constraints: Vec<f64> = (0..200u32).map(f64::from).collect();
    for i in 1..constraints.len() {
        constraints[i] = constraints[i].max(constraints[i - 1] + 10.0);
    }
    black_box(constraints.last().copied());
}

#[inline(never)]
fn resolve_layout_pass() {
    layout_subviews();
    update_display_list();
}

#[inline(never)]
fn layout_subviews() {
    let frames: Vec<(f64, f64, f64, f64)> = (0..100u32)
        .map(|i| (f64::from(i % 10) * 50.0, f64::from(i / 10) * 50.0, 45.0, 45.0))
        .collect();
    black_box(frames.iter().map(|f| f.2 * f.3).sum::<f64>());
}

#[inline(never)]
fn update_display_list() {
    let display_list: Vec<String> = (0..300)
        .map(|i| format!("DrawRect({}, {}, 100, 100)", i * 10, i * 10))
        .collect();
    black_box(display_list.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_workload_completes() {
        let mut rng = StdRng::seed_from_u64(17);
        for workload in Workload::ALL {
            workload.run(&mut rng);
        }
    }

    #[test]
    fn test_dispatch_runs_repeatedly() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            dispatch_workload(&mut rng);
        }
    }
}
