/// Local filename for a downloaded archive: the server-suggested name from a
/// `Content-Disposition` header when present, else `crawl-{task_id}.zip`.
/// The result is safe on Windows and Unix filesystems.
pub fn archive_filename(content_disposition: Option<&str>, task_id: &str) -> String {
    let suggested = content_disposition
        .and_then(disposition_filename)
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty());
    match suggested {
        Some(name) => name,
        None => {
            let id = sanitize(task_id);
            if id.is_empty() {
                "crawl.zip".to_string()
            } else {
                format!("crawl-{id}.zip")
            }
        }
    }
}

fn disposition_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        // Only the final path component is meaningful.
        let base = value.rsplit(['/', '\\']).next().unwrap_or(value);
        Some(base.to_string())
    })
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut name = truncate_on_char_boundary(compacted, 120);
    let stem_len = name.split('.').next().map_or(0, str::len);
    if is_reserved_windows_name(&name[..stem_len]) {
        name.insert(stem_len, '_');
    }
    name
}

fn truncate_on_char_boundary(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut end = max;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::archive_filename;

    #[test]
    fn uses_quoted_disposition_name() {
        assert_eq!(
            archive_filename(Some(r#"attachment; filename="example.com_1700.zip""#), "t"),
            "example.com_1700.zip"
        );
    }

    #[test]
    fn accepts_unquoted_name_and_strips_directories() {
        assert_eq!(
            archive_filename(Some("attachment; filename=../../etc/site.zip"), "t"),
            "site.zip"
        );
    }

    #[test]
    fn falls_back_to_task_id() {
        assert_eq!(archive_filename(None, "abc-123"), "crawl-abc-123.zip");
        assert_eq!(archive_filename(Some("inline"), "abc"), "crawl-abc.zip");
        assert_eq!(archive_filename(Some("attachment; filename=\"\""), "abc"), "crawl-abc.zip");
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        assert_eq!(
            archive_filename(Some("attachment; filename=\"a:b*?c.zip\""), "t"),
            "a_b_c.zip"
        );
        assert_eq!(archive_filename(None, "a/b"), "crawl-a_b.zip");
    }

    #[test]
    fn reserved_windows_names_are_suffixed() {
        assert_eq!(
            archive_filename(Some("attachment; filename=CON.zip"), "t"),
            "CON_.zip"
        );
    }
}
