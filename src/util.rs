//! Shared helpers used across format adapters: text normalization, date and
//! URL parsing, and page-file listing.

use std::cmp::Ordering;

use url::Url;

/// File extensions treated as comic page images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Normalize a text value: trim whitespace and drop empty strings.
///
/// Most ACBF fields are optional free text; a present-but-blank element is
/// treated the same as an absent one.
pub fn xlate(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split a delimited string into trimmed, non-empty items.
pub fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a date string into `(day, month, year)`.
///
/// Accepts ISO-style `YYYY-MM-DD` with the month and day optional, and
/// ignores any time component. Out-of-range month/day values are dropped
/// rather than rejected wholesale, since partial dates are common in
/// hand-edited metadata.
pub fn parse_date_str(value: Option<&str>) -> (Option<u32>, Option<u32>, Option<i32>) {
    let Some(raw) = xlate(value) else {
        return (None, None, None);
    };

    let date_part = raw.split(['T', ' ']).next().unwrap_or_default();
    let mut parts = date_part.split('-');

    let year = parts.next().and_then(|y| y.parse::<i32>().ok());
    let month = parts
        .next()
        .and_then(|m| m.parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m));
    let day = parts
        .next()
        .and_then(|d| d.parse::<u32>().ok())
        .filter(|d| (1..=31).contains(d));

    (day, month, year)
}

/// Normalize a web link, tolerating scheme-less values.
///
/// Database references are frequently written as bare hostnames; those get
/// an `https://` scheme. Values the `url` crate cannot make sense of are
/// kept verbatim rather than dropped.
pub fn parse_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(url) = Url::parse(trimmed) {
        return url.to_string();
    }
    if let Ok(url) = Url::parse(&format!("https://{trimmed}")) {
        return url.to_string();
    }
    trimmed.to_string()
}

/// Filter an archive's entry names down to its page images, naturally
/// ordered.
///
/// The position of a filename in this list is the page's archive index, so
/// the ordering must match what a comic reader would display: natural
/// comparison (`page2` before `page10`), case-insensitive, hidden files
/// skipped.
pub fn page_name_list(names: &[String]) -> Vec<String> {
    let mut files: Vec<String> = names
        .iter()
        .filter(|name| {
            let base = name.rsplit('/').next().unwrap_or(name.as_str());
            !base.starts_with('.') && is_image_name(name)
        })
        .cloned()
        .collect();
    files.sort_by(|a, b| natural_cmp(a, b));
    files
}

fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Compare two strings naturally: digit runs compare as numbers, everything
/// else case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();

    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_digits(&mut ca);
                    let nb = take_digits(&mut cb);
                    match cmp_digit_runs(&na, &nb) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                } else {
                    match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
                        Ordering::Equal => {
                            ca.next();
                            cb.next();
                        }
                        ord => return ord,
                    }
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlate() {
        assert_eq!(xlate(Some("  hello  ")), Some("hello".to_string()));
        assert_eq!(xlate(Some("   ")), None);
        assert_eq!(xlate(Some("")), None);
        assert_eq!(xlate(None), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("a, b , ,c", ','),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_list("  ", ',').is_empty());
    }

    #[test]
    fn test_parse_date_str_full() {
        assert_eq!(parse_date_str(Some("2012-03-14")), (Some(14), Some(3), Some(2012)));
    }

    #[test]
    fn test_parse_date_str_partial() {
        assert_eq!(parse_date_str(Some("2012-03")), (None, Some(3), Some(2012)));
        assert_eq!(parse_date_str(Some("2012")), (None, None, Some(2012)));
        assert_eq!(parse_date_str(None), (None, None, None));
        assert_eq!(parse_date_str(Some("")), (None, None, None));
    }

    #[test]
    fn test_parse_date_str_ignores_time() {
        assert_eq!(
            parse_date_str(Some("2012-03-14T12:00:00")),
            (Some(14), Some(3), Some(2012))
        );
    }

    #[test]
    fn test_parse_date_str_out_of_range() {
        assert_eq!(parse_date_str(Some("2012-13-40")), (None, None, Some(2012)));
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            parse_url("https://example.com/issue/1"),
            "https://example.com/issue/1"
        );
        assert_eq!(
            parse_url("comicvine.gamespot.com/issue/1"),
            "https://comicvine.gamespot.com/issue/1"
        );
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("page2.jpg", "page10.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("Page2.jpg", "page2.jpg"), Ordering::Equal);
        assert_eq!(natural_cmp("a10", "a2b"), Ordering::Greater);
        assert_eq!(natural_cmp("page002", "page2"), Ordering::Equal);
    }

    #[test]
    fn test_page_name_list() {
        let names = vec![
            "page10.jpg".to_string(),
            "page2.jpg".to_string(),
            "metadata.acbf".to_string(),
            ".hidden.png".to_string(),
            "cover.png".to_string(),
        ];
        assert_eq!(
            page_name_list(&names),
            vec!["cover.png".to_string(), "page2.jpg".to_string(), "page10.jpg".to_string()]
        );
    }
}
