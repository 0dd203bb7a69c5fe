//! Lookups over raw response header lines.

/// One raw header chunk from curl as a line without its terminator.
/// Non-UTF-8 bytes (Latin-1 cookie values, say) are replaced rather than dropping the line.
pub(crate) fn header_line(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Values of every `name: value` line matching `name` (case-insensitive), in order.
pub fn header_values<'a>(lines: &'a [String], name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    lines.iter().filter_map(move |line| {
        let (k, v) = line.split_once(':')?;
        if k.trim().eq_ignore_ascii_case(name) {
            Some(v.trim())
        } else {
            None
        }
    })
}

/// The most recently seen value of `name`, if any.
pub fn last_header_value<'a>(lines: &'a [String], name: &'a str) -> Option<&'a str> {
    header_values(lines, name).last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn latin1_header_line_is_kept() {
        let line = header_line(b"Set-Cookie: n=caf\xe9; Path=/\r\n");
        assert!(line.starts_with("Set-Cookie: n=caf"));
        assert!(line.ends_with("; Path=/"));
        let l = vec![line];
        assert!(last_header_value(&l, "set-cookie").is_some());
    }

    #[test]
    fn header_line_strips_terminator() {
        assert_eq!(header_line(b"HTTP/1.1 200 OK\r\n"), "HTTP/1.1 200 OK");
        assert_eq!(header_line(b"\r\n"), "");
    }

    #[test]
    fn collects_repeated_headers_in_order() {
        let l = lines(&[
            "HTTP/1.1 302 Found",
            "Set-Cookie: a=1; Path=/",
            "Location: /home",
            "",
            "HTTP/1.1 200 OK",
            "set-cookie: b=2; Path=/",
        ]);
        let all: Vec<&str> = header_values(&l, "Set-Cookie").collect();
        assert_eq!(all, vec!["a=1; Path=/", "b=2; Path=/"]);
        assert_eq!(last_header_value(&l, "set-cookie"), Some("b=2; Path=/"));
    }

    #[test]
    fn missing_header_is_none() {
        let l = lines(&["HTTP/1.1 200 OK", "Content-Length: 12"]);
        assert_eq!(last_header_value(&l, "set-cookie"), None);
        assert_eq!(last_header_value(&l, "content-length"), Some("12"));
    }

    #[test]
    fn value_keeps_inner_colons() {
        let l = lines(&["Date: Wed, 21 Oct 2015 07:28:00 GMT"]);
        assert_eq!(
            last_header_value(&l, "date"),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }
}
