// Layout helpers for deleting one item from a separated list
use crate::ast::Span;

fn is_horizontal_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Text between two list items holds nothing but whitespace and at most one separator
fn is_clean_gap(gap: &str) -> bool {
    let mut separators = 0;
    for c in gap.chars() {
        match c {
            ',' | ';' => separators += 1,
            c if c.is_whitespace() => {}
            _ => return false,
        }
    }
    separators <= 1
}

fn skip_horizontal_space(source: &str, mut at: usize) -> usize {
    while let Some(c) = source[at..].chars().next() {
        if !is_horizontal_space(c) {
            break;
        }
        at += c.len_utf8();
    }
    at
}

/// End of the separator run after `at`: spaces, one `,` or `;`, spaces
fn separator_end(source: &str, at: usize) -> usize {
    let mut end = skip_horizontal_space(source, at);
    if source[end..].starts_with([',', ';']) {
        end = skip_horizontal_space(source, end + 1);
    }
    end
}

/// If `item` is the only thing on its line (apart from a trailing separator
/// and line comment), the span of the whole line including its newline
fn own_line(source: &str, item: Span) -> Option<Span> {
    let line_start = source[..item.start].rfind('\n').map_or(0, |i| i + 1);
    if !source[line_start..item.start].chars().all(is_horizontal_space) {
        return None;
    }

    let mut end = separator_end(source, item.end);
    if source[end..].starts_with("//") {
        end += source[end..].find('\n').unwrap_or(source.len() - end);
    }

    if end == source.len() {
        return Some(Span::new(line_start, end));
    }
    if source[end..].starts_with("\r\n") {
        return Some(Span::new(line_start, end + 2));
    }
    if source[end..].starts_with('\n') {
        return Some(Span::new(line_start, end + 1));
    }
    None
}

/// Span to delete so that `items[index]` disappears from its list together
/// with exactly one adjacent separator, leaving the neighbours' layout intact.
pub fn removal_span(source: &str, items: &[Span], index: usize) -> Span {
    let item = items[index];

    if let Some(line) = own_line(source, item) {
        return line;
    }

    if let Some(next) = items.get(index + 1) {
        if is_clean_gap(&source[item.end..next.start]) {
            return Span::new(item.start, next.start);
        }
    }

    if let Some(prev) = index.checked_sub(1).map(|i| items[i]) {
        if is_clean_gap(&source[prev.end..item.start]) {
            return Span::new(prev.end, item.end);
        }
    }

    Span::new(item.start, separator_end(source, item.end))
}
