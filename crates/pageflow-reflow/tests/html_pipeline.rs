mod common;

use common::letters;
use pageflow::{parse_html, to_html, EditorState};
use pageflow_reflow::{Paginator, ReflowConfig};

#[test]
fn paginated_html_reloads_as_a_fixed_point() {
    let body: String = (0..6)
        .map(|i| format!("<p>{}</p>", letters(i, 700)))
        .collect();
    let html = format!(
        "<div data-page><h1>Report</h1>{}<div data-page-break></div><p>appendix</p></div>",
        body
    );
    let doc = parse_html(&html).expect("parse");
    assert_eq!(doc.page_count(), 1);
    let text = doc.text_content();

    let mut state = EditorState::new(doc);
    let mut paginator = Paginator::new(ReflowConfig::default());
    let reports = paginator.run_until_idle(&mut state, 32);
    assert!(reports.last().is_some_and(|report| report.converged));
    assert!(state.doc().page_count() > 2);
    assert_eq!(state.doc().text_content(), text);
    let last_page = state.doc().pages.last().expect("page");
    assert_eq!(last_page.text(), "appendix");

    let exported = to_html(state.doc());
    let reloaded = parse_html(&exported).expect("reparse");
    assert_eq!(&reloaded, state.doc());

    let mut reloaded_state = EditorState::new(reloaded);
    let report = Paginator::default()
        .run_pass(&mut reloaded_state)
        .expect("pass");
    assert!(!report.mutated);
}
