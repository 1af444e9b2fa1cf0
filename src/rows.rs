use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static TOTAL_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-total_count="([0-9]+)""#).unwrap());
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>.*?</tr>").unwrap());
static BACK_TO_INV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)back_to_inv\[[0-9]+\]").unwrap());

// Consumed verbatim by the external row checker; keep byte-identical.
const SHELL_HEAD: &str = "<html>\n\
<head><title>Safety Deposit Box</title></head>\n\
<body>\n\
<!-- free safety deposit box! -->\n\
<table>\n";
const SHELL_TAIL: &str = "\n</table>\n</body>\n</html>";

/// Rewrites `data-total_count="N"` as `data-total_count='N'`.
pub fn normalize_total_count(content: &str) -> Cow<'_, str> {
    TOTAL_COUNT_RE.replace_all(content, "data-total_count='${1}'")
}

/// Every `<tr>…</tr>` segment that carries a `back_to_inv[N]` field, in document order.
pub fn matching_rows(content: &str) -> Vec<&str> {
    ROW_RE
        .find_iter(content)
        .map(|m| m.as_str())
        .filter(|row| BACK_TO_INV_RE.is_match(row))
        .collect()
}

/// Normalizes the page, keeps the withdrawable rows and wraps them in the
/// minimal safety deposit box document. `None` when the page has no such rows.
pub fn extract_valid_rows(content: &str) -> Option<String> {
    let content = normalize_total_count(content);
    let rows = matching_rows(&content);
    if rows.is_empty() {
        return None;
    }

    let body = rows.join("\n");
    let mut html = String::with_capacity(SHELL_HEAD.len() + body.len() + SHELL_TAIL.len());
    html.push_str(SHELL_HEAD);
    html.push_str(&body);
    html.push_str(SHELL_TAIL);
    Some(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW_A: &str =
        r#"<tr><td>Blue Grundo Plushie</td><td><input name="back_to_inv[101]" data-total_count="3"></td></tr>"#;
    const ROW_B: &str = "<tr bgcolor='#F6F6F6'><td>Faerie Bubbles</td><td><input name='back_to_inv[202]'></td></tr>";

    #[test]
    fn total_count_quotes() {
        assert_eq!(
            normalize_total_count(r#"<input data-total_count="123">"#),
            "<input data-total_count='123'>"
        );
    }

    #[test]
    fn total_count_leaves_other_attributes() {
        let html = r#"<input data-count="5" data-total_count="x1" value="123">"#;
        assert_eq!(normalize_total_count(html), html);
    }

    #[test]
    fn total_count_keeps_leading_zeros() {
        assert_eq!(
            normalize_total_count(r#"a data-total_count="007" b data-total_count="40""#),
            "a data-total_count='007' b data-total_count='40'"
        );
    }

    #[test]
    fn rows_without_marker() {
        let html = "<table><tr><td>Name</td><td>Qty</td></tr><tr><td>x</td></tr></table>";
        assert!(matching_rows(html).is_empty());
        assert_eq!(extract_valid_rows(html), None);
    }

    #[test]
    fn no_rows_at_all() {
        assert_eq!(extract_valid_rows("<html><body>empty box</body></html>"), None);
    }

    #[test]
    fn wraps_single_row_exactly() {
        let html = format!("<table>{ROW_B}</table>");
        let expected = format!(
            "<html>\n<head><title>Safety Deposit Box</title></head>\n<body>\n\
             <!-- free safety deposit box! -->\n<table>\n{ROW_B}\n</table>\n</body>\n</html>"
        );
        assert_eq!(extract_valid_rows(&html).as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn rows_joined_with_newlines_and_normalized() {
        let html = format!("<table>\n<tr><td>header</td></tr>\n{ROW_A}\n  {ROW_B}\n</table>");
        let out = extract_valid_rows(&html).unwrap();
        let row_a = ROW_A.replace(r#"data-total_count="3""#, "data-total_count='3'");
        assert!(out.contains(&format!("<table>\n{row_a}\n{ROW_B}\n</table>")));
        assert!(out.contains("<!-- free safety deposit box! -->"));
        assert!(!out.contains("header"));
    }

    #[test]
    fn unmarked_row_not_glued_to_next() {
        let html = format!("<tr><td>Total</td></tr>{ROW_B}");
        assert_eq!(matching_rows(&html), vec![ROW_B]);
    }

    #[test]
    fn rows_span_lines_and_ignore_case() {
        let html = "<TR class=\"r\">\n  <TD>Codestone</TD>\n  <td><INPUT NAME=\"BACK_TO_INV[9]\"></td>\n</Tr>";
        assert_eq!(matching_rows(html), vec![html]);
    }

    #[test]
    fn other_tr_prefixed_tags_are_not_rows() {
        let html = "<track src='a'><td>back_to_inv[1]</td></tr>";
        assert!(matching_rows(html).is_empty());
    }

    #[test]
    fn marker_needs_an_index() {
        let html = "<tr><td><input name='back_to_inv[]'></td></tr><tr><td>back_to_inv[x]</td></tr>";
        assert!(matching_rows(html).is_empty());
    }

    #[test]
    fn fixture_page() {
        let html = std::fs::read_to_string("tests/fixtures/sdb_page_3.html").unwrap();
        let rows = matching_rows(&html);
        assert_eq!(rows.len(), 3);
        let out = extract_valid_rows(&html).unwrap();
        assert!(out.starts_with("<html>\n<head><title>Safety Deposit Box</title></head>\n"));
        assert!(out.ends_with("</table>\n</body>\n</html>"));
        assert!(out.contains("data-total_count='12'"));
        assert!(!out.contains(r#"data-total_count="12""#));
        assert!(!out.contains("Remove All"));
    }
}
