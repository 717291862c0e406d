//! HTML rendering of a run report

use std::fmt::Write as _;

use crate::verify::RunReport;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn mark(ok: Option<bool>) -> &'static str {
    match ok {
        Some(true) => r#"<span class="yes" title="OK">&#10004;</span>"#,
        Some(false) => r#"<span class="no" title="FAIL">&#10008;</span>"#,
        None => r#"<span class="unset" title="NOT RUN">&#8211;</span>"#,
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:1.5em}\
th,td{border:1px solid #ccc;padding:.3em .8em;text-align:left}\
.yes{color:#2a2}.no{color:#c22}.unset{color:#888}";

/// Full page: one table per base DN, one row per supplier and consumer
pub fn render_html(report: &RunReport) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>ds-repltest</title>\n<style>{}</style>\n</head>\n<body>\n",
        STYLE
    );
    let _ = writeln!(
        html,
        "<h1>Replication test {}</h1>",
        if report.success { mark(Some(true)) } else { mark(Some(false)) }
    );
    let _ = writeln!(
        html,
        "<p>Test date: {}</p>",
        report.finished_at.format("%d/%m/%Y at %H:%M:%S")
    );

    let mut current: Option<(&str, &str)> = None;
    for (instance, base_dn, supplier, outcome) in report.results.iter() {
        if current != Some((instance, base_dn)) {
            if current.is_some() {
                html.push_str("</table>\n");
            }
            let _ = writeln!(
                html,
                "<h2>{} &mdash; {}</h2>\n<table>\n<tr><th>Supplier</th><th>Consumer</th><th>Status</th></tr>",
                escape(instance),
                escape(base_dn)
            );
            current = Some((instance, base_dn));
        }
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td></td><td>{}</td></tr>",
            escape(supplier),
            mark(outcome.status)
        );
        for (consumer, ok) in &outcome.replica {
            let _ = writeln!(
                html,
                "<tr><td></td><td>{}</td><td>{}</td></tr>",
                escape(consumer),
                mark(Some(*ok))
            );
        }
    }
    if current.is_some() {
        html.push_str("</table>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}
