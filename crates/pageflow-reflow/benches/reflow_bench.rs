use std::hint::black_box;
use std::time::Instant;

use pageflow::{Block, Document, EditorState, MarkSet, Page};
use pageflow_reflow::{Paginator, ReflowConfig};

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: String,
    case: String,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    mean_ns: u128,
    max_ns: u128,
}

fn percentile_u128(sorted: &[u128], percentile: f64) -> u128 {
    let idx = ((sorted.len().saturating_sub(1) as f64) * percentile).round() as usize;
    sorted[idx]
}

fn words(seed: usize, count: usize) -> String {
    const WORDS: &[&str] = &[
        "page", "flow", "measure", "split", "margin", "caret", "block", "reflow", "layout",
        "height",
    ];
    (0..count)
        .map(|i| WORDS[(seed + i * 7) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything on one page, as after a large paste.
fn pasted_document(paragraphs: usize) -> Document {
    let blocks = (0..paragraphs)
        .map(|i| match i % 12 {
            0 => Block::heading(2, words(i, 6)),
            7 => Block::image(format!("fig-{}.png", i), Some(240.0)),
            _ => Block::paragraph(words(i, 60 + i % 40)),
        })
        .collect();
    Document::from_blocks(blocks)
}

/// Already paginated document.
fn settled_document(paragraphs: usize) -> Document {
    let mut state = EditorState::new(pasted_document(paragraphs));
    Paginator::default().run_until_idle(&mut state, 1_000);
    state.doc().clone()
}

fn run_case<F>(
    fixture: &str,
    case: &str,
    warmup_iters: usize,
    measure_iters: usize,
    mut op: F,
) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup_iters {
        black_box(op());
    }

    let mut time_samples = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        let start = Instant::now();
        black_box(op());
        time_samples.push(start.elapsed().as_nanos());
    }
    time_samples.sort_unstable();
    let time_sum: u128 = time_samples.iter().copied().sum();

    CaseResult {
        fixture: fixture.to_string(),
        case: case.to_string(),
        iterations: measure_iters,
        min_ns: time_samples[0],
        median_ns: percentile_u128(&time_samples, 0.5),
        mean_ns: time_sum / time_samples.len() as u128,
        max_ns: time_samples[time_samples.len() - 1],
    }
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup_iters = if quick { 1 } else { 2 };
    let measure_iters = if quick { 3 } else { 10 };

    println!("# pageflow-reflow benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={}",
        if quick { "quick" } else { "full" },
        warmup_iters,
        measure_iters
    );
    println!("fixture,case,iterations,min_ns,median_ns,mean_ns,max_ns");

    let fixtures: &[(&str, usize)] = &[("short", 24), ("chapter", 120), ("book", 480)];
    let mut results = Vec::new();
    for (fixture, paragraphs) in fixtures {
        let pasted = pasted_document(*paragraphs);
        let settled = settled_document(*paragraphs);

        results.push(run_case(
            fixture,
            "paginate_pasted",
            warmup_iters,
            measure_iters,
            || {
                let mut state = EditorState::new(pasted.clone());
                let mut paginator = Paginator::new(ReflowConfig::default());
                paginator.run_until_idle(&mut state, 1_000);
                state.doc().page_count()
            },
        ));

        results.push(run_case(
            fixture,
            "stable_pass",
            warmup_iters,
            measure_iters,
            || {
                let mut state = EditorState::new(settled.clone());
                let mut paginator = Paginator::default();
                paginator
                    .run_pass(&mut state)
                    .map(|report| report.iterations)
                    .unwrap_or(0)
            },
        ));

        results.push(run_case(
            fixture,
            "type_on_first_page",
            warmup_iters,
            measure_iters,
            || {
                let mut state = EditorState::new(settled.clone());
                let mut paginator = Paginator::default();
                let text = words(3, 80);
                state
                    .insert_text(&text, MarkSet::new())
                    .unwrap_or_else(|e| panic!("insert failed: {}", e));
                paginator.run_until_idle(&mut state, 1_000);
                state.doc().page_count()
            },
        ));

        results.push(run_case(
            fixture,
            "delete_first_page",
            warmup_iters,
            measure_iters,
            || {
                let mut state = EditorState::new(settled.clone());
                let mut paginator = Paginator::default();
                let mut tr = state.transaction();
                let first = tr.doc().pages.first().map(Page::node_size).unwrap_or(0);
                if tr.doc().page_count() > 1 {
                    tr.delete(0, first)
                        .unwrap_or_else(|e| panic!("delete failed: {}", e));
                    state
                        .apply(tr)
                        .unwrap_or_else(|e| panic!("apply failed: {}", e));
                }
                paginator.run_until_idle(&mut state, 1_000);
                state.doc().page_count()
            },
        ));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{}",
            result.fixture,
            result.case,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.mean_ns,
            result.max_ns
        );
    }
}
