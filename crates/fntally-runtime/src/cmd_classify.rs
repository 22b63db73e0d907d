//! `fntally classify` — show how individual lines would be classified.

use fntally_core::MessageClassifier;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ClassifiedLine<'a> {
    line: &'a str,
    function: Option<String>,
    is_result: bool,
    verdict: fntally_core::Verdict,
}

/// Render one row (or JSON object) per input line.
pub fn format_classifications(
    classifier: &MessageClassifier,
    lines: &[String],
    json: bool,
) -> anyhow::Result<String> {
    let rows: Vec<ClassifiedLine<'_>> = lines
        .iter()
        .map(|line| {
            let c = classifier.classify(line);
            ClassifiedLine {
                line,
                function: c.function,
                is_result: c.is_result,
                verdict: c.verdict,
            }
        })
        .collect();

    if json {
        return Ok(serde_json::to_string_pretty(&rows)?);
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        out.push(format!(
            "{:<8} {:<20} {:<6} {}",
            row.verdict.as_str().to_uppercase(),
            row.function.as_deref().unwrap_or("-"),
            if row.is_result { "result" } else { "-" },
            row.line
        ));
    }
    Ok(out.join("\n"))
}
